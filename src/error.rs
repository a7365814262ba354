//! Error types for the monitor
//!
//! Probe failures are not errors: a failed attempt is simply counted as such. Everything
//! else that can go wrong ends up in [`MonitorError`], and [`MonitorError::is_fatal`]
//! decides whether the process keeps looping or exits.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors that can occur while running the monitor
#[derive(Debug)]
pub enum MonitorError {
    /// A configuration file does not exist
    MissingConfig(PathBuf),

    /// A configuration value is missing or out of range
    Configuration(String),

    /// The host registry could not be loaded for a cycle
    Registry(String),

    /// Snapshot or report serialization failed
    Serialization(String),

    /// A previously written snapshot could not be read back
    Read { path: PathBuf, source: io::Error },

    /// The snapshot could not be written to its destination
    Write { path: PathBuf, source: io::Error },

    /// The notification state could not be read or persisted
    State { path: PathBuf, source: io::Error },

    /// The digest could not be delivered
    Delivery(String),

    /// The HTML report could not be written
    Report { path: PathBuf, source: io::Error },
}

impl MonitorError {
    /// Whether this error should terminate the monitor.
    ///
    /// Configuration errors always do. Write errors only do when the destination itself is
    /// unusable, i.e. no later cycle could ever succeed in writing it.
    pub fn is_fatal(&self) -> bool {
        match self {
            MonitorError::MissingConfig(_) | MonitorError::Configuration(_) => true,
            MonitorError::Write { source, .. } => is_structural(source),
            _ => false,
        }
    }
}

fn is_structural(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::IsADirectory
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::InvalidInput
    )
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::MissingConfig(path) => {
                write!(f, "configuration file not found: {}", path.display())
            }
            MonitorError::Configuration(msg) => write!(f, "invalid configuration: {}", msg),
            MonitorError::Registry(msg) => write!(f, "failed to load host registry: {}", msg),
            MonitorError::Serialization(msg) => write!(f, "serialization error: {}", msg),
            MonitorError::Read { path, source } => {
                write!(f, "failed to read snapshot {}: {}", path.display(), source)
            }
            MonitorError::Write { path, source } => {
                write!(f, "failed to write snapshot to {}: {}", path.display(), source)
            }
            MonitorError::State { path, source } => write!(
                f,
                "notification state error at {}: {}",
                path.display(),
                source
            ),
            MonitorError::Delivery(msg) => write!(f, "digest delivery failed: {}", msg),
            MonitorError::Report { path, source } => {
                write!(f, "failed to write report {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Read { source, .. }
            | MonitorError::Write { source, .. }
            | MonitorError::State { source, .. }
            | MonitorError::Report { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Delivery(err.to_string())
    }
}
