//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use ferry::{Connection, ConnectionId, ConnectionProfile, Event, EventHandler, Job, JobId, JobState};
use std::time::Duration;
use tokio::sync::Mutex;

/// A profile with a fixed ID pointing at an address nothing listens on.
pub fn profile(id: &str) -> ConnectionProfile {
    ConnectionProfile::with_id(
        ConnectionId::new(id),
        format!("{} server", id),
        "127.0.0.1:2121",
        "ferry",
        "secret",
    )
}

/// `now + ms` milliseconds.
pub fn in_ms(ms: i64) -> DateTime<Utc> {
    Utc::now() + TimeDelta::milliseconds(ms)
}

/// Wait for a job to record at least `runs` past runs, polling the connection.
///
/// # Panics
///
/// Panics if the timeout is reached first.
pub async fn wait_for_runs(
    connection: &Connection,
    job_id: &JobId,
    runs: usize,
    timeout: Duration,
) -> Job {
    let start = tokio::time::Instant::now();
    loop {
        let job = connection.get_job(job_id).unwrap();
        if job.past_runs().len() >= runs {
            return job;
        }
        if start.elapsed() > timeout {
            panic!(
                "Timeout waiting for job {} to reach {} runs, current: {}",
                job_id,
                runs,
                job.past_runs().len()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait for a job to reach an expected state, polling the connection.
///
/// # Panics
///
/// Panics if the timeout is reached first.
pub async fn wait_for_state(
    connection: &Connection,
    job_id: &JobId,
    expected: JobState,
    timeout: Duration,
) -> Job {
    let start = tokio::time::Instant::now();
    loop {
        let job = connection.get_job(job_id).unwrap();
        if job.state() == expected {
            return job;
        }
        if start.elapsed() > timeout {
            panic!(
                "Timeout waiting for job {} to reach {:?}, current state: {:?}",
                job_id,
                expected,
                job.state()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll `check` until it returns true.
///
/// # Panics
///
/// Panics if the timeout is reached first.
pub async fn wait_until(mut check: impl FnMut() -> bool, timeout: Duration, what: &str) {
    let start = tokio::time::Instant::now();
    while !check() {
        if start.elapsed() > timeout {
            panic!("Timeout waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Event handler that keeps every event it sees.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    /// Short names of the events for one job, in emission order.
    pub async fn kinds_for(&self, job_id: &JobId) -> Vec<&'static str> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|event| event.job_id() == job_id)
            .map(|event| match event {
                Event::JobArmed { .. } => "armed",
                Event::JobSkipped { .. } => "skipped",
                Event::JobFired { .. } => "fired",
                Event::JobCancelled { .. } => "cancelled",
                Event::JobExpired { .. } => "expired",
                Event::JobArmFailed { .. } => "arm_failed",
            })
            .collect()
    }
}

#[async_trait]
impl EventHandler for EventLog {
    async fn handle(&self, event: &Event) {
        self.events.lock().await.push(event.clone());
    }
}
