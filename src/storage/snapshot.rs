//! Snapshot file
//!
//! The snapshot is written as a pretty-printed JSON array, one object per host:
//!
//! ```json
//! [
//!   {
//!     "Name": "Web 01",
//!     "IP": "10.0.0.1",
//!     "Application": "Shop",
//!     "Environment": "Production",
//!     "Type": "VM",
//!     "SuccessPercentage": 100.0,
//!     "LastChecked": "2026-10-16 09:00:04"
//!   }
//! ]
//! ```
//!
//! Every write replaces the whole file through a sibling temporary file, so readers never
//! observe a partially written snapshot.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{HostStatus, MonitorError, MonitorResult, Snapshot};

/// Format of the `LastChecked` field.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotRecord {
    pub name: String,

    #[serde(rename = "IP")]
    pub ip: String,

    pub application: Option<String>,

    pub environment: Option<String>,

    #[serde(rename = "Type")]
    pub kind: Option<String>,

    pub success_percentage: f64,

    pub last_checked: String,
}

impl SnapshotRecord {
    pub fn checked_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.last_checked, TIMESTAMP_FORMAT).ok()
    }
}

impl From<&HostStatus> for SnapshotRecord {
    fn from(status: &HostStatus) -> Self {
        let host = &status.host;
        Self {
            name: host.name.clone(),
            ip: host.probe_address().unwrap_or_default().to_string(),
            application: host.application.clone(),
            environment: host.environment.clone(),
            kind: host.kind.clone(),
            success_percentage: status.outcome.percentage(),
            last_checked: status.checked_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("snapshot"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Replace the destination with `snapshot`.
    #[instrument(skip_all, fields(path = %self.path.display(), hosts = snapshot.len()))]
    pub async fn write(&self, snapshot: &Snapshot) -> MonitorResult<()> {
        let records: Vec<SnapshotRecord> =
            snapshot.statuses().iter().map(SnapshotRecord::from).collect();
        let mut body = serde_json::to_vec_pretty(&records)?;
        body.push(b'\n');

        let temp = self.temp_path();
        tokio::fs::write(&temp, &body)
            .await
            .map_err(|source| MonitorError::Write {
                path: self.path.clone(),
                source,
            })?;

        if let Err(source) = tokio::fs::rename(&temp, &self.path).await {
            if let Err(e) = tokio::fs::remove_file(&temp).await {
                warn!("could not remove {}: {e}", temp.display());
            }
            return Err(MonitorError::Write {
                path: self.path.clone(),
                source,
            });
        }

        debug!("snapshot written");
        Ok(())
    }
}

/// Parse a snapshot file written by [`SnapshotWriter`].
pub async fn read_snapshot(path: impl AsRef<Path>) -> MonitorResult<Vec<SnapshotRecord>> {
    let path = path.as_ref();
    let content = tokio::fs::read(path)
        .await
        .map_err(|source| MonitorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(serde_json::from_slice(&content)?)
}
