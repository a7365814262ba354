//! Daily digest gating, delivery and state persistence

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use pingwatch::{
    HostStatus, ProbeOutcome, Snapshot,
    notify::{NotificationScheduler, WebhookSink},
    storage::{FileStateStore, MemoryStateStore, NotificationState, SnapshotWriter, StateStore},
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn snapshot() -> Snapshot {
    Snapshot::new(
        friday_at(9, 0, 0),
        vec![
            HostStatus::new(
                host("a", Some("10.0.0.1")),
                ProbeOutcome::new(4, 4),
                friday_at(9, 0, 0),
            ),
            HostStatus::new(
                host("b", Some("10.0.0.2")),
                ProbeOutcome::new(0, 4),
                friday_at(9, 0, 0),
            ),
        ],
    )
}

#[tokio::test]
async fn test_two_matching_cycles_deliver_once() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStateStore::default());
    let scheduler = NotificationScheduler::new(weekday_schedule(), Some(sink.clone()), store.clone());

    let state = NotificationState::default();
    let state = scheduler
        .maybe_notify(&snapshot(), friday_at(9, 0, 5), state)
        .await;
    let state = scheduler
        .maybe_notify(&snapshot(), friday_at(9, 0, 40), state)
        .await;

    assert_eq!(sink.delivered().len(), 1);
    assert_eq!(sink.attempts(), 1);
    assert!(state.is_notified_on(friday_at(9, 0, 0).date()));
    assert_eq!(store.load().await.unwrap(), state);

    let digest = &sink.delivered()[0];
    assert_eq!((digest.online, digest.offline), (1, 1));
    assert_eq!(digest.offline_hosts[0].name, "Server b");
}

#[tokio::test]
async fn test_next_day_delivers_again() {
    let sink = Arc::new(RecordingSink::default());
    let scheduler = scheduler(sink.clone());

    let state = scheduler
        .maybe_notify(&snapshot(), friday_at(9, 0, 0), NotificationState::default())
        .await;
    let state = scheduler
        .maybe_notify(&snapshot(), saturday_at(9, 0, 0), state)
        .await;

    assert_eq!(sink.delivered().len(), 2);
    assert!(state.is_notified_on(saturday_at(9, 0, 0).date()));
}

#[tokio::test]
async fn test_failed_delivery_keeps_state() {
    let sink = Arc::new(RecordingSink::failing());
    let store = Arc::new(MemoryStateStore::default());
    let scheduler = NotificationScheduler::new(weekday_schedule(), Some(sink.clone()), store.clone());

    let state = scheduler
        .maybe_notify(&snapshot(), friday_at(9, 0, 0), NotificationState::default())
        .await;

    assert_eq!(state, NotificationState::default());
    assert_eq!(store.load().await.unwrap(), NotificationState::default());

    // another cycle inside the same minute gets another chance
    sink.set_failing(false);
    let state = scheduler
        .maybe_notify(&snapshot(), friday_at(9, 0, 30), state)
        .await;

    assert_eq!(sink.attempts(), 2);
    assert_eq!(sink.delivered().len(), 1);
    assert!(state.is_notified_on(friday_at(9, 0, 0).date()));
}

#[tokio::test]
async fn test_failed_delivery_is_not_retried_after_the_minute() {
    let sink = Arc::new(RecordingSink::failing());
    let scheduler = scheduler(sink.clone());

    let state = scheduler
        .maybe_notify(&snapshot(), friday_at(9, 0, 0), NotificationState::default())
        .await;
    sink.set_failing(false);
    scheduler
        .maybe_notify(&snapshot(), friday_at(9, 1, 0), state)
        .await;

    assert_eq!(sink.attempts(), 1);
    assert!(sink.delivered().is_empty());
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("last-notified.txt");
    let sink = Arc::new(RecordingSink::default());

    let first = NotificationScheduler::new(
        weekday_schedule(),
        Some(sink.clone()),
        Arc::new(FileStateStore::new(&state_file)),
    );
    let state = first.load_state().await;
    first
        .maybe_notify(&snapshot(), friday_at(9, 0, 0), state)
        .await;
    assert_eq!(std::fs::read_to_string(&state_file).unwrap(), "2026-10-16\n");

    // new process, same day, same minute
    let second = NotificationScheduler::new(
        weekday_schedule(),
        Some(sink.clone()),
        Arc::new(FileStateStore::new(&state_file)),
    );
    let state = second.load_state().await;
    second
        .maybe_notify(&snapshot(), friday_at(9, 0, 45), state)
        .await;

    assert_eq!(sink.delivered().len(), 1);
}

#[tokio::test]
async fn test_store_failure_still_blocks_second_digest_in_process() {
    let sink = Arc::new(RecordingSink::default());
    let scheduler = NotificationScheduler::new(
        weekday_schedule(),
        Some(sink.clone()),
        Arc::new(BrokenStateStore),
    );

    let state = scheduler
        .maybe_notify(&snapshot(), friday_at(9, 0, 0), NotificationState::default())
        .await;
    scheduler
        .maybe_notify(&snapshot(), friday_at(9, 0, 30), state)
        .await;

    assert_eq!(sink.delivered().len(), 1);
}

#[tokio::test]
async fn test_disabled_or_off_day_sends_nothing() {
    let sink = Arc::new(RecordingSink::default());
    let mut schedule = weekday_schedule();
    schedule.enabled = false;
    let disabled = NotificationScheduler::new(
        schedule,
        Some(sink.clone()),
        Arc::new(MemoryStateStore::default()),
    );
    disabled
        .maybe_notify(&snapshot(), friday_at(9, 0, 0), NotificationState::default())
        .await;

    let sunday = NaiveDate::from_ymd_opt(2026, 10, 18)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    scheduler(sink.clone())
        .maybe_notify(&snapshot(), sunday, NotificationState::default())
        .await;

    assert_eq!(sink.attempts(), 0);
}

#[tokio::test]
async fn test_html_report_written_alongside_delivery() {
    let dir = tempfile::tempdir().unwrap();
    let reports = dir.path().join("reports");
    let sink = Arc::new(RecordingSink::default());
    let scheduler = scheduler(sink.clone()).with_report_dir(&reports);

    scheduler
        .maybe_notify(&snapshot(), friday_at(9, 0, 0), NotificationState::default())
        .await;

    let html = std::fs::read_to_string(reports.join("server-status-2026-10-16.html")).unwrap();
    let digest = &sink.delivered()[0];
    assert!(html.contains(&digest.title()));
    assert!(html.contains("<td>Server b</td><td>10.0.0.2</td>"));
}

#[tokio::test]
async fn test_runner_delivers_once_through_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/digest"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("last-notified.txt");
    let sink = WebhookSink::new(format!("{}/digest", server.uri()), Duration::from_secs(5)).unwrap();
    let scheduler = NotificationScheduler::new(
        weekday_schedule(),
        Some(Arc::new(sink)),
        Arc::new(FileStateStore::new(&state_file)),
    );
    let clock = FixedClock::new(friday_at(9, 0, 1));
    let prober = Arc::new(ScriptedProber::new(&[("10.0.0.1", 4)]));
    let mut runner = runner(
        vec![host("a", Some("10.0.0.1"))],
        prober,
        SnapshotWriter::new(dir.path().join("status.json")),
        scheduler,
        clock.clone(),
    );

    runner.tick().await.unwrap();
    clock.set(friday_at(9, 0, 31));
    runner.tick().await.unwrap();

    assert!(runner.state().is_notified_on(friday_at(9, 0, 0).date()));
    assert_eq!(std::fs::read_to_string(&state_file).unwrap(), "2026-10-16\n");
    // MockServer verifies `expect(1)` on drop
}

#[tokio::test(start_paused = true)]
async fn test_interval_skipping_the_minute_sends_nothing() {
    let sink = Arc::new(RecordingSink::default());
    let clock = FixedClock::new(friday_at(8, 59, 45));
    let dir = tempfile::tempdir().unwrap();
    let mut runner = runner(
        vec![host("a", Some("10.0.0.1"))],
        Arc::new(ScriptedProber::new(&[("10.0.0.1", 4)])),
        SnapshotWriter::new(dir.path().join("status.json")),
        scheduler(sink.clone()),
        clock.clone(),
    );

    runner.tick().await.unwrap();
    clock.set(friday_at(9, 1, 15));
    runner.tick().await.unwrap();

    assert_eq!(sink.attempts(), 0);
    assert_eq!(runner.state(), NotificationState::default());
}
