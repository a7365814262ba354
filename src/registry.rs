//! Host registry
//!
//! The registry file is a JSON object keyed by host key. Keys keep their file order, which
//! is also the order of every snapshot built from the registry.
//!
//! ```json
//! {
//!   "web01": { "name": "Web 01", "ip": "10.0.0.1", "application": "Shop",
//!              "environment": "Production", "type": "VM" }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{Host, MonitorError, MonitorResult};

#[derive(Debug, Clone, Default, Deserialize)]
struct HostEntry {
    name: Option<String>,
    ip: Option<String>,
    application: Option<String>,
    environment: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// The monitored hosts, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostRegistry {
    hosts: Vec<Host>,
}

impl HostRegistry {
    pub fn new(hosts: Vec<Host>) -> Self {
        Self { hosts }
    }

    pub fn from_json(content: &str) -> MonitorResult<Self> {
        let entries: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(content).map_err(|e| MonitorError::Registry(e.to_string()))?;

        let hosts = entries
            .into_iter()
            .map(|(key, value)| {
                let entry: HostEntry = serde_json::from_value(value)
                    .map_err(|e| MonitorError::Registry(format!("host '{key}': {e}")))?;
                Ok(Host {
                    name: entry.name.unwrap_or_else(|| key.clone()),
                    key,
                    address: entry.ip,
                    application: entry.application,
                    environment: entry.environment,
                    kind: entry.kind,
                })
            })
            .collect::<MonitorResult<Vec<_>>>()?;

        Ok(Self { hosts })
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Something that yields a fresh registry at the start of every cycle.
pub trait RegistrySource: Send + Sync {
    fn load(&self) -> MonitorResult<HostRegistry>;
}

/// A fixed, in-memory registry.
impl RegistrySource for HostRegistry {
    fn load(&self) -> MonitorResult<HostRegistry> {
        Ok(self.clone())
    }
}

/// Registry re-read from disk on every load, so edits apply from the next cycle on.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistrySource for FileRegistry {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> MonitorResult<HostRegistry> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| MonitorError::Registry(format!("{}: {e}", self.path.display())))?;
        let registry = HostRegistry::from_json(&content)?;
        debug!("loaded {} hosts", registry.len());
        Ok(registry)
    }
}
