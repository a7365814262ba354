//! CycleRunner - drives the monitor
//!
//! ## Cycle
//!
//! ```text
//! ┌──────────────► load registry ──► probe hosts (registry order) ──► Snapshot
//! │                                                                      │
//! │                                         SnapshotWriter ◄─────────────┤
//! │                                  NotificationScheduler ◄─────────────┘
//! │                                                                      │
//! └────────────────────────────── sleep(interval) ◄──────────────────────┘
//! ```
//!
//! Hosts without an address are skipped and left out of the snapshot. A registry that fails
//! to load skips the cycle. The loop only ends on a fatal error.

use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::{Config, PingConfig};
use crate::monitors::probe::{PingProber, ProbeSettings, Prober, probe};
use crate::notify::{NotificationScheduler, NotificationSink, WebhookSink};
use crate::registry::RegistrySource;
use crate::storage::{FileStateStore, NotificationState, SnapshotWriter};
use crate::util::{Clock, LocalClock};
use crate::{Classification, Host, HostStatus, MonitorResult, Snapshot};

pub struct CycleRunner {
    registry: Box<dyn RegistrySource>,
    prober: Arc<dyn Prober>,
    settings: ProbeSettings,
    concurrency: usize,
    interval: Duration,
    writer: SnapshotWriter,
    scheduler: NotificationScheduler,
    clock: Arc<dyn Clock>,
    state: NotificationState,
}

impl CycleRunner {
    pub fn new(
        registry: Box<dyn RegistrySource>,
        prober: Arc<dyn Prober>,
        writer: SnapshotWriter,
        scheduler: NotificationScheduler,
    ) -> Self {
        let ping = PingConfig::default();
        Self {
            registry,
            prober,
            settings: ProbeSettings::from(&ping),
            concurrency: ping.concurrency,
            interval: ping.interval(),
            writer,
            scheduler,
            clock: Arc::new(LocalClock),
            state: NotificationState::default(),
        }
    }

    /// Wire up the production components described by `config`.
    ///
    /// The persisted notification state is loaded here, so a restart on a day that already
    /// had its digest does not send another one.
    pub async fn from_config(
        config: &Config,
        registry: impl RegistrySource + 'static,
    ) -> MonitorResult<Self> {
        let notification = &config.notification;
        let sink: Option<Arc<dyn NotificationSink>> = match notification.webhook_url.as_deref() {
            Some(url) if !url.trim().is_empty() => {
                Some(Arc::new(WebhookSink::new(url.trim(), notification.timeout())?))
            }
            _ => None,
        };

        let scheduler = NotificationScheduler::new(
            notification.schedule()?,
            sink,
            Arc::new(FileStateStore::new(&config.output.state_file)),
        )
        .with_report_dir(&config.output.report_dir);
        let state = scheduler.load_state().await;

        Ok(Self::new(
            Box::new(registry),
            Arc::new(PingProber),
            SnapshotWriter::new(&config.output.status_file),
            scheduler,
        )
        .with_ping_config(&config.ping)
        .with_state(state))
    }

    pub fn with_ping_config(mut self, ping: &PingConfig) -> Self {
        self.settings = ProbeSettings::from(ping);
        self.concurrency = ping.concurrency.max(1);
        self.interval = ping.interval();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_state(mut self, state: NotificationState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> NotificationState {
        self.state
    }

    /// Probe every registered host once and build the snapshot.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> MonitorResult<Snapshot> {
        let registry = self.registry.load()?;
        let taken_at = self.clock.now();
        debug!("starting cycle over {} hosts", registry.len());

        let targets = registry
            .hosts()
            .iter()
            .filter_map(|host| match host.probe_address() {
                Some(address) => Some((host, address)),
                None => {
                    warn!("{} ({}): no address configured, skipping", host.name, host.key);
                    None
                }
            });

        // buffered() yields in input order regardless of completion order
        let statuses: Vec<HostStatus> = stream::iter(targets)
            .map(|(host, address)| self.check_host(host, address))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let snapshot = Snapshot::new(taken_at, statuses);
        info!(
            "cycle finished: {} online, {} partial, {} offline, {} skipped",
            snapshot.count(Classification::Online),
            snapshot.count(Classification::Partial),
            snapshot.count(Classification::Offline),
            registry.len() - snapshot.len()
        );
        Ok(snapshot)
    }

    async fn check_host(&self, host: &Host, address: &str) -> MonitorResult<HostStatus> {
        let outcome = probe(self.prober.as_ref(), address, &self.settings).await?;
        let status = HostStatus::new(host.clone(), outcome, self.clock.now());
        debug!(
            "{} ({address}): {}/{} replies ({}%) -> {}",
            host.name,
            outcome.successes,
            outcome.attempts,
            outcome.percentage(),
            status.classification
        );
        Ok(status)
    }

    /// Run one cycle: probe, write the snapshot, maybe notify.
    ///
    /// Recoverable failures are logged and yield `Ok(None)`; only fatal errors are returned.
    #[instrument(skip(self))]
    pub async fn tick(&mut self) -> MonitorResult<Option<Snapshot>> {
        let snapshot = match self.run_cycle().await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("cycle aborted: {e}");
                return Ok(None);
            }
        };

        if let Err(e) = self.writer.write(&snapshot).await {
            if e.is_fatal() {
                error!("{e}; output destination is unusable");
                return Err(e);
            }
            error!("{e}");
        }

        self.state = self
            .scheduler
            .maybe_notify(&snapshot, self.clock.now(), self.state)
            .await;

        Ok(Some(snapshot))
    }

    /// Cycle forever. Returns only with a fatal error.
    pub async fn run(mut self) -> MonitorResult<()> {
        info!(
            "monitoring started, cycle interval {}s",
            self.interval.as_secs()
        );

        loop {
            self.tick().await?;
            trace!("sleeping for {:?}", self.interval);
            tokio::time::sleep(self.interval).await;
        }
    }
}
