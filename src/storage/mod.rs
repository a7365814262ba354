//! Durable outputs of the monitor
//!
//! - [`snapshot`]: the per-cycle status file, overwritten on every cycle
//! - [`state`]: the date of the last delivered digest, behind the [`StateStore`] trait so
//!   the scheduler can run against a file or against memory

pub mod snapshot;
pub mod state;

pub use snapshot::{SnapshotRecord, SnapshotWriter, read_snapshot};
pub use state::{FileStateStore, MemoryStateStore, NotificationState, StateStore};
