//! Daily digest scheduling
//!
//! ## Gate
//!
//! ```text
//! notifications disabled            → NotifyEvaluation::Disabled
//! weekday not in the allow-list     → NotifyEvaluation::OffDay
//! now as "HH:MM" != configured time → NotifyEvaluation::NotYet
//! digest already delivered today    → NotifyEvaluation::AlreadySent
//! otherwise                         → NotifyEvaluation::Due
//! ```
//!
//! The time check is an exact minute match. A cycle interval that steps over the configured
//! minute means no digest that day.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Datelike, NaiveDateTime};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::Snapshot;
use crate::config::NotifySchedule;
use crate::notify::{Digest, NotificationSink, report};
use crate::storage::{NotificationState, StateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyEvaluation {
    Disabled,
    OffDay,
    NotYet,
    AlreadySent,
    Due,
}

impl NotifyEvaluation {
    pub fn evaluate(
        schedule: &NotifySchedule,
        now: NaiveDateTime,
        state: &NotificationState,
    ) -> NotifyEvaluation {
        if !schedule.enabled {
            return NotifyEvaluation::Disabled;
        }

        if !schedule.weekdays.contains(&now.weekday()) {
            return NotifyEvaluation::OffDay;
        }

        if now.format("%H:%M").to_string() != schedule.time {
            return NotifyEvaluation::NotYet;
        }

        if state.is_notified_on(now.date()) {
            return NotifyEvaluation::AlreadySent;
        }

        NotifyEvaluation::Due
    }
}

pub struct NotificationScheduler {
    schedule: NotifySchedule,
    sink: Option<Arc<dyn NotificationSink>>,
    store: Arc<dyn StateStore>,
    report_dir: Option<PathBuf>,
}

impl NotificationScheduler {
    pub fn new(
        schedule: NotifySchedule,
        sink: Option<Arc<dyn NotificationSink>>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            schedule,
            sink,
            store,
            report_dir: None,
        }
    }

    /// Also render every digest as HTML into `dir`.
    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = Some(dir.into());
        self
    }

    pub fn schedule(&self) -> &NotifySchedule {
        &self.schedule
    }

    /// Read the persisted state, falling back to "never notified" when the store fails.
    pub async fn load_state(&self) -> NotificationState {
        match self.store.load().await {
            Ok(state) => state,
            Err(e) => {
                error!("{e}; assuming no digest was sent yet");
                NotificationState::default()
            }
        }
    }

    /// Send the digest for `snapshot` if one is due at `now`.
    ///
    /// Returns the state to use for the next cycle. It only moves forward when the sink
    /// accepted the digest.
    #[instrument(skip_all, fields(now = %now))]
    pub async fn maybe_notify(
        &self,
        snapshot: &Snapshot,
        now: NaiveDateTime,
        state: NotificationState,
    ) -> NotificationState {
        let evaluation = NotifyEvaluation::evaluate(&self.schedule, now, &state);
        trace!("notification gate: {evaluation:?}");
        if evaluation != NotifyEvaluation::Due {
            return state;
        }

        let Some(sink) = &self.sink else {
            warn!("digest due but no notification sink is configured");
            return state;
        };

        let digest = Digest::from_snapshot(snapshot, now);

        if let Some(dir) = &self.report_dir
            && let Err(e) = report::write_report(dir, &digest).await
        {
            error!("{e}");
        }

        if let Err(e) = sink.deliver(&digest).await {
            error!("{e}; no retry today unless the notify minute matches again");
            return state;
        }

        info!(
            "digest sent: {} online, {} partial, {} offline, {} invalid",
            digest.online,
            digest.partial,
            digest.offline,
            digest.invalid()
        );

        let next = NotificationState::notified_on(now.date());
        if let Err(e) = self.store.save(&next).await {
            error!("{e}; a restart today may send the digest again");
        } else {
            debug!("notification state advanced to {}", now.date());
        }
        next
    }
}
