//! Notification state persistence
//!
//! The only value that survives restarts is the calendar date of the last digest that was
//! delivered. It is stored as a single `yyyy-MM-dd` line.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::{MonitorError, MonitorResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date of the last delivered digest, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationState {
    pub last_notified: Option<NaiveDate>,
}

impl NotificationState {
    pub fn notified_on(date: NaiveDate) -> Self {
        Self {
            last_notified: Some(date),
        }
    }

    pub fn is_notified_on(&self, date: NaiveDate) -> bool {
        self.last_notified == Some(date)
    }
}

/// Durable home of the [`NotificationState`].
///
/// The cycle runner is the only writer; implementations do not need to guard against
/// concurrent saves beyond being `Send + Sync`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the persisted state. A store that was never written yields the default state.
    async fn load(&self) -> MonitorResult<NotificationState>;

    async fn save(&self, state: &NotificationState) -> MonitorResult<()>;
}

/// Single-line file store.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, source: io::Error) -> MonitorError {
        MonitorError::State {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> MonitorResult<NotificationState> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no notification state yet");
                return Ok(NotificationState::default());
            }
            Err(e) => return Err(self.error(e)),
        };

        let line = content.trim().trim_start_matches('\u{feff}');
        if line.is_empty() {
            return Ok(NotificationState::default());
        }

        match NaiveDate::parse_from_str(line, DATE_FORMAT) {
            Ok(date) => Ok(NotificationState::notified_on(date)),
            Err(e) => {
                warn!("ignoring unreadable notification state '{line}': {e}");
                Ok(NotificationState::default())
            }
        }
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn save(&self, state: &NotificationState) -> MonitorResult<()> {
        let content = state
            .last_notified
            .map(|date| format!("{}\n", date.format(DATE_FORMAT)))
            .unwrap_or_default();

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| self.error(e))?;
        debug!("notification state saved: {:?}", state.last_notified);
        Ok(())
    }
}

/// In-memory store (no persistence), for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: RwLock<NotificationState>,
}

impl MemoryStateStore {
    pub fn new(state: NotificationState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> MonitorResult<NotificationState> {
        Ok(*self.state.read().await)
    }

    async fn save(&self, state: &NotificationState) -> MonitorResult<()> {
        *self.state.write().await = *state;
        Ok(())
    }
}
