pub mod config;
pub mod error;
pub mod monitors;
pub mod notify;
pub mod registry;
pub mod storage;
pub mod util;

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use error::{MonitorError, MonitorResult};

/// A monitored target as listed in the host registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub key: String,
    pub name: String,
    pub address: Option<String>,
    pub application: Option<String>,
    pub environment: Option<String>,
    pub kind: Option<String>,
}

impl Host {
    /// The address to probe, if one is configured.
    ///
    /// Blank strings count as absent.
    pub fn probe_address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
    }
}

/// Successful attempts out of the attempt budget for one host in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub successes: u32,
    pub attempts: u32,
}

impl ProbeOutcome {
    pub fn new(successes: u32, attempts: u32) -> Self {
        Self {
            successes: successes.min(attempts),
            attempts,
        }
    }

    /// Success percentage rounded to two decimal places.
    pub fn percentage(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        let ratio = f64::from(self.successes) / f64::from(self.attempts);
        (ratio * 100.0 * 100.0).round() / 100.0
    }

    pub fn classification(&self) -> Classification {
        Classification::classify(self.successes, self.attempts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Online,
    Partial,
    Offline,
}

impl Classification {
    /// Classify a probe result.
    ///
    /// Every attempt answered is ONLINE, none answered is OFFLINE and anything in
    /// between is PARTIAL.
    pub fn classify(successes: u32, attempts: u32) -> Classification {
        if successes == 0 {
            Classification::Offline
        } else if successes >= attempts {
            Classification::Online
        } else {
            Classification::Partial
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Online => "ONLINE",
            Classification::Partial => "PARTIAL",
            Classification::Offline => "OFFLINE",
        };
        f.write_str(label)
    }
}

/// The evaluated state of one host in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct HostStatus {
    pub host: Host,
    pub outcome: ProbeOutcome,
    pub classification: Classification,
    pub checked_at: NaiveDateTime,
}

impl HostStatus {
    pub fn new(host: Host, outcome: ProbeOutcome, checked_at: NaiveDateTime) -> Self {
        Self {
            classification: outcome.classification(),
            host,
            outcome,
            checked_at,
        }
    }
}

/// All host statuses produced by one cycle, in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub taken_at: NaiveDateTime,
    statuses: Vec<HostStatus>,
}

impl Snapshot {
    pub fn new(taken_at: NaiveDateTime, statuses: Vec<HostStatus>) -> Self {
        Self { taken_at, statuses }
    }

    pub fn statuses(&self) -> &[HostStatus] {
        &self.statuses
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn count(&self, classification: Classification) -> usize {
        self.statuses
            .iter()
            .filter(|status| status.classification == classification)
            .count()
    }
}
