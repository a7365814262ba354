use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use chrono::Weekday;
use regex::Regex;
use tracing::trace;

use crate::{MonitorError, MonitorResult};

static NOTIFY_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("notify time pattern is valid")
});

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ping: PingConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub notification: NotificationConfig,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct PingConfig {
    /// Seconds to sleep between two cycles
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Timeout of a single probe attempt in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Payload size of a single probe attempt in bytes
    #[serde(default = "default_payload_size")]
    pub payload_size: u16,

    /// Attempts per host and cycle
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Number of hosts probed at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            timeout_ms: default_timeout(),
            payload_size: default_payload_size(),
            attempts: default_attempts(),
            concurrency: default_concurrency(),
        }
    }
}

impl PingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct OutputConfig {
    /// Snapshot destination, overwritten every cycle
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,

    /// Holds the date of the last delivered digest
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Directory receiving the HTML rendering of each digest
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            status_file: default_status_file(),
            state_file: default_state_file(),
            report_dir: default_report_dir(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Weekdays on which a digest may be sent, e.g. `["Monday", "Fri"]`
    #[serde(default = "default_weekdays")]
    pub weekdays: Vec<String>,

    /// Wall clock minute of the digest, `HH:MM`
    #[serde(default = "default_notify_time")]
    pub time: String,

    pub webhook_url: Option<String>,

    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            weekdays: default_weekdays(),
            time: default_notify_time(),
            webhook_url: None,
            timeout_secs: default_webhook_timeout(),
        }
    }
}

/// Parsed form of [`NotificationConfig`] used by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifySchedule {
    pub enabled: bool,
    pub weekdays: Vec<Weekday>,
    pub time: String,
}

impl NotificationConfig {
    pub fn schedule(&self) -> MonitorResult<NotifySchedule> {
        let weekdays = self
            .weekdays
            .iter()
            .map(|day| {
                day.trim().parse::<Weekday>().map_err(|_| {
                    MonitorError::Configuration(format!("unknown weekday '{day}'"))
                })
            })
            .collect::<MonitorResult<Vec<_>>>()?;

        if !NOTIFY_TIME.is_match(&self.time) {
            return Err(MonitorError::Configuration(format!(
                "notification time '{}' is not in HH:MM format",
                self.time
            )));
        }

        Ok(NotifySchedule {
            enabled: self.enabled,
            weekdays,
            time: self.time.clone(),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Check every value the monitor relies on before the loop starts.
    pub fn validate(&self) -> MonitorResult<()> {
        let ping = &self.ping;
        if ping.attempts == 0 {
            return Err(MonitorError::Configuration(
                "ping.attempts must be at least 1".to_string(),
            ));
        }
        if ping.interval_secs == 0 {
            return Err(MonitorError::Configuration(
                "ping.interval_secs must be at least 1".to_string(),
            ));
        }
        if ping.timeout_ms == 0 {
            return Err(MonitorError::Configuration(
                "ping.timeout_ms must be at least 1".to_string(),
            ));
        }
        if ping.concurrency == 0 {
            return Err(MonitorError::Configuration(
                "ping.concurrency must be at least 1".to_string(),
            ));
        }

        ensure_parent_dir(&self.output.status_file, "output.status_file")?;
        ensure_parent_dir(&self.output.state_file, "output.state_file")?;

        self.notification.schedule()?;

        if self.notification.enabled {
            let url = self.notification.webhook_url.as_deref().unwrap_or_default();
            if url.trim().is_empty() {
                return Err(MonitorError::Configuration(
                    "notification.webhook_url is required when notifications are enabled"
                        .to_string(),
                ));
            }
            if self.notification.timeout_secs == 0 {
                return Err(MonitorError::Configuration(
                    "notification.timeout_secs must be at least 1".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn ensure_parent_dir(path: &Path, key: &str) -> MonitorResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(MonitorError::Configuration(format!(
                "{key}: directory {} does not exist",
                parent.display()
            )))
        }
        _ => Ok(()),
    }
}

fn default_interval() -> u64 {
    30
}

fn default_timeout() -> u64 {
    1000
}

fn default_payload_size() -> u16 {
    32
}

fn default_attempts() -> u32 {
    4
}

fn default_concurrency() -> usize {
    1
}

fn default_status_file() -> PathBuf {
    PathBuf::from("./server-status.json")
}

fn default_state_file() -> PathBuf {
    PathBuf::from("./last-notified.txt")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("./reports")
}

fn default_weekdays() -> Vec<String> {
    ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_notify_time() -> String {
    String::from("09:00")
}

fn default_webhook_timeout() -> u64 {
    10
}

pub fn read_config_file(path: impl AsRef<Path>) -> MonitorResult<Config> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(MonitorError::MissingConfig(path.to_path_buf()));
    }

    let file_content = std::fs::read_to_string(path).map_err(|e| {
        MonitorError::Configuration(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&file_content)
        .map_err(|e| MonitorError::Configuration(format!("{}: {e}", path.display())))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
