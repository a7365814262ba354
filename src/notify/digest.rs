//! Digest: the aggregated view of a snapshot that gets sent out once a day.

use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::util::is_valid_ipv4;
use crate::{Classification, HostStatus, Snapshot};

/// Host line of a digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestHost {
    pub name: String,
    pub address: String,
    pub application: Option<String>,
    pub environment: Option<String>,
    pub kind: Option<String>,
}

impl From<&HostStatus> for DigestHost {
    fn from(status: &HostStatus) -> Self {
        let host = &status.host;
        Self {
            name: host.name.clone(),
            address: host.probe_address().unwrap_or_default().to_string(),
            application: host.application.clone(),
            environment: host.environment.clone(),
            kind: host.kind.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub generated_at: NaiveDateTime,
    pub total: usize,
    pub online: usize,
    pub partial: usize,
    pub offline: usize,
    pub offline_hosts: Vec<DigestHost>,
    pub invalid_hosts: Vec<DigestHost>,
}

impl Digest {
    pub fn from_snapshot(snapshot: &Snapshot, generated_at: NaiveDateTime) -> Self {
        let statuses = snapshot.statuses();
        Self {
            generated_at,
            total: snapshot.len(),
            online: snapshot.count(Classification::Online),
            partial: snapshot.count(Classification::Partial),
            offline: snapshot.count(Classification::Offline),
            offline_hosts: statuses
                .iter()
                .filter(|status| status.classification == Classification::Offline)
                .map(DigestHost::from)
                .collect(),
            invalid_hosts: statuses
                .iter()
                .filter(|status| !is_valid_ipv4(status.host.probe_address().unwrap_or_default()))
                .map(DigestHost::from)
                .collect(),
        }
    }

    pub fn invalid(&self) -> usize {
        self.invalid_hosts.len()
    }

    pub fn title(&self) -> String {
        format!(
            "Server status digest {}",
            self.generated_at.format("%Y-%m-%d %H:%M")
        )
    }

    /// Plain-text message delivered to the webhook.
    pub fn message(&self) -> String {
        let mut message = String::new();

        let _ = writeln!(message, "📊 {}", self.title());
        let _ = writeln!(
            message,
            "Total: {} | 🟢 Online: {} | 🟡 Partial: {} | 🔴 Offline: {} | ⚠️ Invalid IP: {}",
            self.total,
            self.online,
            self.partial,
            self.offline,
            self.invalid()
        );

        message.push('\n');
        if self.offline_hosts.is_empty() {
            message.push_str("✅ No offline servers\n");
        } else {
            message.push_str("🔴 Offline servers:\n");
            for host in &self.offline_hosts {
                let _ = writeln!(
                    message,
                    "- {} ({}) | App: {} | Env: {} | Type: {}",
                    host.name,
                    host.address,
                    or_dash(&host.application),
                    or_dash(&host.environment),
                    or_dash(&host.kind)
                );
            }
        }

        if !self.invalid_hosts.is_empty() {
            message.push('\n');
            message.push_str("⚠️ Servers with invalid IP:\n");
            for host in &self.invalid_hosts {
                let _ = writeln!(message, "- {} ({})", host.name, host.address);
            }
        }

        message
    }
}

pub(crate) fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().filter(|v| !v.is_empty()).unwrap_or("-")
}
