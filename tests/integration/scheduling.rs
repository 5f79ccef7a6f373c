//! Scheduling integration tests.
//!
//! These tests drive jobs through the registry and the connection façade and
//! check what the executor sees and what the jobs record.

use crate::common::{EventLog, in_ms, profile, wait_for_runs, wait_for_state};

use chrono::{TimeDelta, Utc};
use ferry::testing::RecordingExecutor;
use ferry::{
    CancelOutcome, ConnectionRegistry, Direction, EventBus, JobDescriptor, JobState, Scheduler,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn registry_with(executor: Arc<RecordingExecutor>) -> ConnectionRegistry {
    ConnectionRegistry::new(Scheduler::new(executor), None)
}

/// Test: A recurring job fires at start + n * interval, without drift.
#[tokio::test]
async fn test_recurring_job_fires_on_interval_grid() {
    let executor = Arc::new(RecordingExecutor::new());
    let registry = registry_with(Arc::clone(&executor));
    let connection = registry.create_connection(profile("grid")).await.unwrap();

    let start = Utc::now();
    let descriptor = JobDescriptor::new("report.csv", Direction::Download, start)
        .with_dirs("/outgoing", "/tmp/in")
        .with_interval(Duration::from_millis(80));
    let job_id = connection.create_job(&descriptor).await.unwrap();

    wait_for_runs(&connection, &job_id, 3, Duration::from_secs(5)).await;
    connection.cancel_job(&job_id).await.unwrap();
    let job = wait_for_state(&connection, &job_id, JobState::Cancelled, Duration::from_secs(5)).await;

    for (n, run) in job.past_runs().iter().enumerate() {
        let expected = start + TimeDelta::milliseconds(80 * (n as i64 + 1));
        assert_eq!(run.scheduled_for, expected, "run {} drifted", n);
        assert!(run.succeeded());
    }

    let runs = job.past_runs().len();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(connection.get_job(&job_id).unwrap().past_runs().len(), runs);
}

/// Test: A one-shot job fires exactly once and expires.
#[tokio::test]
async fn test_one_shot_job_expires_after_single_transfer() {
    let executor = Arc::new(RecordingExecutor::new());
    let registry = registry_with(Arc::clone(&executor));
    let connection = registry.create_connection(profile("once")).await.unwrap();

    let descriptor = JobDescriptor::new("daily.zip", Direction::Download, in_ms(40))
        .with_dirs("/pub/", "/var/spool");
    let job_id = connection.create_job(&descriptor).await.unwrap();
    assert_eq!(connection.get_job(&job_id).unwrap().state(), JobState::Armed);

    let job = wait_for_state(&connection, &job_id, JobState::Expired, Duration::from_secs(5)).await;
    assert_eq!(job.past_runs().len(), 1);
    assert_eq!(job.past_runs()[0].scheduled_for, descriptor.start_at);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let requests = executor.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].remote_path(), "/pub/daily.zip");
    assert_eq!(requests[0].local_path(), PathBuf::from("/var/spool/daily.zip"));
    assert_eq!(requests[0].profile.id.as_str(), "once");
}

/// Test: A job whose fire time already passed is stored but never armed.
#[tokio::test]
async fn test_elapsed_one_shot_is_skipped() {
    let executor = Arc::new(RecordingExecutor::new());
    let registry = registry_with(Arc::clone(&executor));
    let connection = registry.create_connection(profile("late")).await.unwrap();

    let descriptor = JobDescriptor::new(
        "stale.txt",
        Direction::Upload,
        Utc::now() - TimeDelta::minutes(5),
    );
    let job_id = connection.create_job(&descriptor).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let job = connection.get_job(&job_id).unwrap();
    assert_eq!(job.state(), JobState::Pending);
    assert!(job.past_runs().is_empty());
    assert_eq!(executor.call_count(), 0);
}

/// Test: A recurring job with a past start is armed for its next run.
#[tokio::test]
async fn test_past_start_with_future_next_run_is_armed() {
    let executor = Arc::new(RecordingExecutor::new());
    let registry = registry_with(Arc::clone(&executor));
    let connection = registry.create_connection(profile("catchup")).await.unwrap();

    let start = Utc::now() - TimeDelta::milliseconds(200);
    let descriptor = JobDescriptor::new("feed.xml", Direction::Download, start)
        .with_interval(Duration::from_millis(300));
    let job_id = connection.create_job(&descriptor).await.unwrap();

    let job = wait_for_runs(&connection, &job_id, 1, Duration::from_secs(5)).await;
    assert_eq!(
        job.past_runs()[0].scheduled_for,
        start + TimeDelta::milliseconds(300)
    );
    connection.remove_job(&job_id).await.unwrap();
}

/// Test: Transfer failures are recorded and the job keeps its schedule.
#[tokio::test]
async fn test_failed_transfers_are_recorded_and_job_continues() {
    let executor = Arc::new(RecordingExecutor::new());
    executor.fail_with("550 file unavailable");
    let registry = registry_with(Arc::clone(&executor));
    let connection = registry.create_connection(profile("flaky")).await.unwrap();

    let descriptor = JobDescriptor::new("missing.dat", Direction::Download, Utc::now())
        .with_dirs("/in", "/tmp")
        .with_interval(Duration::from_millis(60));
    let job_id = connection.create_job(&descriptor).await.unwrap();

    let job = wait_for_runs(&connection, &job_id, 2, Duration::from_secs(5)).await;
    for run in &job.past_runs()[..2] {
        let error = run.error.as_deref().unwrap();
        assert!(error.contains("550 file unavailable"), "got {}", error);
        assert!(error.contains("/in/missing.dat"), "got {}", error);
    }

    executor.succeed();
    let recovered = job.past_runs().len() + 2;
    let job = wait_for_runs(&connection, &job_id, recovered, Duration::from_secs(5)).await;
    assert!(job.past_runs().last().unwrap().succeeded());
    assert_ne!(job.state(), JobState::Expired);

    connection.remove_job(&job_id).await.unwrap();
}

/// Test: Cancelling an armed job stops it and keeps it listed.
#[tokio::test]
async fn test_cancel_armed_job_keeps_it_listed() {
    let executor = Arc::new(RecordingExecutor::new());
    let registry = registry_with(Arc::clone(&executor));
    let connection = registry.create_connection(profile("stop")).await.unwrap();

    let descriptor = JobDescriptor::new("big.iso", Direction::Download, in_ms(150))
        .with_interval(Duration::from_millis(100));
    let job_id = connection.create_job(&descriptor).await.unwrap();

    let outcome = connection.cancel_job(&job_id).await.unwrap();
    assert_eq!(outcome, CancelOutcome::Cancelled);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(executor.call_count(), 0);

    let jobs = connection.list_jobs().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].state(), JobState::Cancelled);
    assert!(!jobs[0].is_recurring());

    let again = connection.cancel_job(&job_id).await.unwrap();
    assert_eq!(again, CancelOutcome::AlreadyFinished(JobState::Cancelled));
}

/// Test: Lifecycle events arrive in order for a one-shot job.
#[tokio::test]
async fn test_one_shot_event_sequence() {
    let executor = Arc::new(RecordingExecutor::new());
    let events = Arc::new(EventBus::new());
    let log = Arc::new(EventLog::new());
    events.register(log.clone()).await;

    let scheduler = Scheduler::new(executor).with_event_bus(events);
    let registry = ConnectionRegistry::new(scheduler, None);
    let connection = registry.create_connection(profile("events")).await.unwrap();

    let descriptor = JobDescriptor::new("a.txt", Direction::Upload, in_ms(30));
    let job_id = connection.create_job(&descriptor).await.unwrap();
    wait_for_state(&connection, &job_id, JobState::Expired, Duration::from_secs(5)).await;

    // The expired event is emitted right after the state change.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(log.kinds_for(&job_id).await, vec!["armed", "fired", "expired"]);
}

/// Test: Jobs of one connection are listed in creation order.
#[tokio::test]
async fn test_jobs_listed_in_creation_order() {
    let executor = Arc::new(RecordingExecutor::new());
    let registry = registry_with(executor);
    let connection = registry.create_connection(profile("order")).await.unwrap();

    let mut created = Vec::new();
    for name in ["c.txt", "a.txt", "b.txt"] {
        let descriptor = JobDescriptor::new(name, Direction::Download, in_ms(60_000));
        created.push(connection.create_job(&descriptor).await.unwrap());
    }

    let listed: Vec<_> = connection
        .list_jobs()
        .unwrap()
        .iter()
        .map(|job| job.id().clone())
        .collect();
    assert_eq!(listed, created);

    registry.retire_all().await.unwrap();
    assert!(
        connection
            .list_jobs()
            .unwrap()
            .iter()
            .all(|job| job.state() == JobState::Cancelled)
    );
}
