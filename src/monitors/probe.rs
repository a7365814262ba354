//! Reachability probing
//!
//! A probe is a fixed number of independent attempts against one address. Each attempt
//! either gets a reply or it does not; timeouts, unreachable hosts and failures to even
//! start the attempt all count the same way. Only an attempt budget of zero is an error.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument, trace};

use crate::config::PingConfig;
use crate::{MonitorError, MonitorResult, ProbeOutcome};

/// Pause between two attempts against the same address.
pub const ATTEMPT_DELAY: Duration = Duration::from_millis(100);

// Process startup on top of ping's own deadline.
const SPAWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    pub attempts: u32,
    pub timeout: Duration,
    pub payload_size: u16,
}

impl From<&PingConfig> for ProbeSettings {
    fn from(config: &PingConfig) -> Self {
        Self {
            attempts: config.attempts,
            timeout: config.timeout(),
            payload_size: config.payload_size,
        }
    }
}

/// Why a single attempt did not get a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    TimedOut,
    NoReply(String),
    Error(String),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::TimedOut => write!(f, "timed out"),
            AttemptFailure::NoReply(msg) => write!(f, "no reply: {msg}"),
            AttemptFailure::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// A single reachability attempt.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn attempt(
        &self,
        address: &str,
        timeout: Duration,
        payload_size: u16,
    ) -> Result<(), AttemptFailure>;
}

/// Sends one ICMP echo request per attempt through the system `ping` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingProber;

#[async_trait]
impl Prober for PingProber {
    async fn attempt(
        &self,
        address: &str,
        timeout: Duration,
        payload_size: u16,
    ) -> Result<(), AttemptFailure> {
        if address.starts_with('-') {
            return Err(AttemptFailure::Error(format!(
                "refusing to pass '{address}' to ping"
            )));
        }

        let mut command = Command::new("ping");
        command
            .args(ping_args(address, timeout, payload_size))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(timeout + SPAWN_GRACE, command.status()).await {
            Err(_) => Err(AttemptFailure::TimedOut),
            Ok(Err(e)) => Err(AttemptFailure::Error(format!("failed to run ping: {e}"))),
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(AttemptFailure::NoReply(format!("ping exited with {status}"))),
        }
    }
}

#[cfg(windows)]
fn ping_args(address: &str, timeout: Duration, payload_size: u16) -> Vec<String> {
    vec![
        "-n".to_string(),
        "1".to_string(),
        "-w".to_string(),
        timeout.as_millis().to_string(),
        "-l".to_string(),
        payload_size.to_string(),
        address.to_string(),
    ]
}

// BSD ping takes the reply deadline in milliseconds.
#[cfg(any(target_os = "macos", target_os = "freebsd"))]
fn ping_args(address: &str, timeout: Duration, payload_size: u16) -> Vec<String> {
    vec![
        "-c".to_string(),
        "1".to_string(),
        "-W".to_string(),
        timeout.as_millis().to_string(),
        "-s".to_string(),
        payload_size.to_string(),
        address.to_string(),
    ]
}

// iputils ping takes whole seconds.
#[cfg(not(any(windows, target_os = "macos", target_os = "freebsd")))]
fn ping_args(address: &str, timeout: Duration, payload_size: u16) -> Vec<String> {
    let seconds = timeout.as_millis().div_ceil(1000).max(1);
    vec![
        "-c".to_string(),
        "1".to_string(),
        "-W".to_string(),
        seconds.to_string(),
        "-s".to_string(),
        payload_size.to_string(),
        address.to_string(),
    ]
}

/// Run the full attempt budget against `address` and count the replies.
#[instrument(skip(prober, settings))]
pub async fn probe(
    prober: &dyn Prober,
    address: &str,
    settings: &ProbeSettings,
) -> MonitorResult<ProbeOutcome> {
    if settings.attempts == 0 {
        return Err(MonitorError::Configuration(
            "attempt budget must be at least 1".to_string(),
        ));
    }

    let mut successes = 0;
    for attempt in 1..=settings.attempts {
        if attempt > 1 {
            tokio::time::sleep(ATTEMPT_DELAY).await;
        }

        match prober
            .attempt(address, settings.timeout, settings.payload_size)
            .await
        {
            Ok(()) => {
                successes += 1;
                trace!("attempt {attempt}/{}: reply", settings.attempts);
            }
            Err(failure) => {
                debug!("attempt {attempt}/{}: {failure}", settings.attempts);
            }
        }
    }

    Ok(ProbeOutcome::new(successes, settings.attempts))
}
