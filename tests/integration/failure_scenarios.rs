//! Failure handling: what keeps the loop alive and what stops it

use std::sync::Arc;

use assert_matches::assert_matches;
use pingwatch::{
    MonitorError,
    monitors::CycleRunner,
    notify::NotificationScheduler,
    storage::{NotificationState, SnapshotWriter},
};

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn test_registry_failure_skips_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let status_file = dir.path().join("status.json");
    let sink = Arc::new(RecordingSink::default());
    let mut runner = CycleRunner::new(
        Box::new(BrokenRegistry),
        Arc::new(ScriptedProber::default()),
        SnapshotWriter::new(&status_file),
        scheduler(sink.clone()),
    )
    .with_clock(FixedClock::new(friday_at(9, 0, 0)));

    let result = runner.tick().await;

    assert_matches!(result, Ok(None));
    assert!(!status_file.exists());
    assert_eq!(sink.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_output_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let status_file = dir.path().join("missing").join("status.json");
    let mut runner = runner(
        vec![host("a", Some("10.0.0.1"))],
        Arc::new(ScriptedProber::new(&[("10.0.0.1", 4)])),
        SnapshotWriter::new(&status_file),
        scheduler(Arc::new(RecordingSink::default())),
        FixedClock::new(friday_at(12, 0, 0)),
    );

    let err = runner.tick().await.unwrap_err();

    assert_matches!(&err, MonitorError::Write { path, .. } if path == &status_file);
    assert!(err.is_fatal());
}

#[tokio::test(start_paused = true)]
async fn test_directory_as_output_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let status_file = dir.path().join("status.json");
    std::fs::create_dir(&status_file).unwrap();
    let mut runner = runner(
        vec![host("a", Some("10.0.0.1"))],
        Arc::new(ScriptedProber::new(&[("10.0.0.1", 4)])),
        SnapshotWriter::new(&status_file),
        scheduler(Arc::new(RecordingSink::default())),
        FixedClock::new(friday_at(12, 0, 0)),
    );

    let err = runner.tick().await.unwrap_err();

    assert!(err.is_fatal());
    assert!(!dir.path().join("status.json.tmp").exists());
}

#[tokio::test(start_paused = true)]
async fn test_delivery_failure_keeps_loop_running() {
    let dir = tempfile::tempdir().unwrap();
    let status_file = dir.path().join("status.json");
    let sink = Arc::new(RecordingSink::failing());
    let mut runner = runner(
        vec![host("a", Some("10.0.0.1"))],
        Arc::new(ScriptedProber::new(&[("10.0.0.1", 4)])),
        SnapshotWriter::new(&status_file),
        scheduler(sink.clone()),
        FixedClock::new(friday_at(9, 0, 0)),
    );

    let snapshot = runner.tick().await.unwrap();

    assert!(snapshot.is_some());
    assert!(status_file.exists());
    assert_eq!(sink.attempts(), 1);
    assert_eq!(runner.state(), NotificationState::default());
}

#[tokio::test(start_paused = true)]
async fn test_state_store_failure_still_advances_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let scheduler = NotificationScheduler::new(
        weekday_schedule(),
        Some(sink.clone()),
        Arc::new(BrokenStateStore),
    );
    let mut runner = runner(
        vec![host("a", Some("10.0.0.1"))],
        Arc::new(ScriptedProber::new(&[("10.0.0.1", 4)])),
        SnapshotWriter::new(dir.path().join("status.json")),
        scheduler,
        FixedClock::new(friday_at(9, 0, 0)),
    );

    runner.tick().await.unwrap();
    runner.tick().await.unwrap();

    assert!(runner.state().is_notified_on(friday_at(9, 0, 0).date()));
    assert_eq!(sink.delivered().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_sink_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let scheduler = NotificationScheduler::new(
        weekday_schedule(),
        None,
        Arc::new(pingwatch::storage::MemoryStateStore::default()),
    );
    let mut runner = runner(
        vec![host("a", Some("10.0.0.1"))],
        Arc::new(ScriptedProber::new(&[("10.0.0.1", 4)])),
        SnapshotWriter::new(dir.path().join("status.json")),
        scheduler,
        FixedClock::new(friday_at(9, 0, 0)),
    );

    assert!(runner.tick().await.unwrap().is_some());
    assert_eq!(runner.state(), NotificationState::default());
}

#[tokio::test]
async fn test_zero_attempts_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = runner(
        vec![host("a", Some("10.0.0.1"))],
        Arc::new(ScriptedProber::new(&[("10.0.0.1", 4)])),
        SnapshotWriter::new(dir.path().join("status.json")),
        scheduler(Arc::new(RecordingSink::default())),
        FixedClock::new(friday_at(12, 0, 0)),
    )
    .with_ping_config(&ping_config(0, 1));

    let err = runner.tick().await.unwrap_err();

    assert_matches!(err, MonitorError::Configuration(_));
    assert!(!dir.path().join("status.json").exists());
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_hosts_are_offline_not_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = runner(
        vec![host("a", Some("10.0.0.1")), host("b", Some("not-an-ip"))],
        Arc::new(ScriptedProber::default()),
        SnapshotWriter::new(dir.path().join("status.json")),
        scheduler(Arc::new(RecordingSink::default())),
        FixedClock::new(friday_at(12, 0, 0)),
    );

    let snapshot = runner.tick().await.unwrap().unwrap();

    assert_eq!(snapshot.count(pingwatch::Classification::Offline), 2);
}
