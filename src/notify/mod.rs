//! Daily digest notifications
//!
//! ## Flow
//!
//! ```text
//! Snapshot → NotificationScheduler (gate) → Digest → HTML report
//!                                                  → NotificationSink (webhook)
//!                                                  → StateStore (on success only)
//! ```

pub mod digest;
pub mod report;
pub mod scheduler;
pub mod sink;

pub use digest::{Digest, DigestHost};
pub use scheduler::{NotificationScheduler, NotifyEvaluation};
pub use sink::{NotificationSink, WebhookMessage, WebhookSink};
