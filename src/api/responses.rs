//! API response types.
//!
//! Connection responses never carry the password.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::connection::Connection;
use crate::core::job::{Direction, Job, JobState, RunRecord};
use crate::scheduler::CancelOutcome;

/// Convert Duration to milliseconds.
fn duration_to_millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

fn state_to_string(state: JobState) -> String {
    match state {
        JobState::Pending => "pending",
        JobState::Armed => "armed",
        JobState::Firing => "firing",
        JobState::Cancelled => "cancelled",
        JobState::Expired => "expired",
    }
    .to_string()
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Generic message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Connection summary.
#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    pub id: String,
    pub name: String,
    pub server_address: String,
    pub username: String,
    pub job_count: usize,
}

impl From<&Connection> for ConnectionResponse {
    fn from(connection: &Connection) -> Self {
        let profile = connection.profile();
        Self {
            id: profile.id.to_string(),
            name: profile.name.clone(),
            server_address: profile.server_address.clone(),
            username: profile.username.clone(),
            job_count: connection.list_jobs().map(|jobs| jobs.len()).unwrap_or(0),
        }
    }
}

/// List of connections response.
#[derive(Debug, Serialize)]
pub struct ConnectionListResponse {
    pub connections: Vec<ConnectionResponse>,
    pub count: usize,
}

/// Connection with its jobs.
#[derive(Debug, Serialize)]
pub struct ConnectionDetailResponse {
    #[serde(flatten)]
    pub connection: ConnectionResponse,
    pub jobs: Vec<JobResponse>,
}

/// Job details.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub remote_dir: String,
    pub local_dir: String,
    pub file_name: String,
    pub direction: Direction,
    pub start_at: DateTime<Utc>,
    pub interval_ms: u64,
    pub next_run: DateTime<Utc>,
    pub state: String,
    pub run_count: usize,
    pub past_runs: Vec<RunRecord>,
}

impl From<&Job> for JobResponse {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id().to_string(),
            remote_dir: job.remote_dir().to_string(),
            local_dir: job.local_dir().to_string(),
            file_name: job.file_name().to_string(),
            direction: job.direction(),
            start_at: job.start_at(),
            interval_ms: duration_to_millis(job.interval()),
            next_run: job.next_run(),
            state: state_to_string(job.state()),
            run_count: job.past_runs().len(),
            past_runs: job.past_runs().to_vec(),
        }
    }
}

/// List of jobs response.
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobResponse>,
    pub count: usize,
}

/// Cancel response.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub job_id: String,
    pub outcome: String,
    pub job: JobResponse,
}

impl CancelResponse {
    /// Build a response from the outcome and the job after cancellation.
    pub fn new(outcome: CancelOutcome, job: &Job) -> Self {
        let outcome = match outcome {
            CancelOutcome::Cancelled => "cancelled",
            CancelOutcome::Deferred => "deferred",
            CancelOutcome::AlreadyFinished(_) => "already_finished",
        };
        Self {
            job_id: job.id().to_string(),
            outcome: outcome.to_string(),
            job: JobResponse::from(job),
        }
    }
}

/// Remote directory listing.
#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub path: String,
    pub entries: Vec<String>,
    pub count: usize,
}
