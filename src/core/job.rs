//! Transfer job definition.
//!
//! A job describes one recurring (or one-shot) file transfer attached to a
//! connection: what to move, in which direction, and when. The identity and
//! transfer target are fixed at creation; `next_run`, `past_runs` and `state`
//! are owned by the scheduler.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::types::JobId;

/// Errors raised while validating a job descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    /// The file name was empty or only whitespace.
    #[error("file name must not be empty")]
    EmptyFileName,

    /// The interval was negative.
    #[error("interval must not be negative (got {0} ms)")]
    NegativeInterval(i64),

    /// The first fire time cannot be represented.
    #[error("interval of {0} ms is out of range")]
    IntervalOutOfRange(i64),
}

/// Direction of a transfer relative to the remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Copy `remote_dir/file_name` to `local_dir/file_name`.
    Download,
    /// Copy `local_dir/file_name` to `remote_dir/file_name`.
    Upload,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Download => write!(f, "download"),
            Direction::Upload => write!(f, "upload"),
        }
    }
}

/// Scheduling state of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Created (or reloaded) but no timer is set.
    #[default]
    Pending,
    /// A timer is set and waiting to fire.
    Armed,
    /// The transfer is in progress.
    Firing,
    /// Cancelled by a caller. Terminal.
    Cancelled,
    /// Fired with a zero interval. Terminal.
    Expired,
}

impl JobState {
    /// Whether no further fires can happen from this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Cancelled | JobState::Expired)
    }
}

/// One past execution of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// The `next_run` value the fire was scheduled for.
    pub scheduled_for: DateTime<Utc>,
    /// Transfer failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunRecord {
    /// Record a successful transfer.
    pub fn success(scheduled_for: DateTime<Utc>) -> Self {
        Self {
            scheduled_for,
            error: None,
        }
    }

    /// Record a failed transfer.
    pub fn failure(scheduled_for: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            scheduled_for,
            error: Some(error.into()),
        }
    }

    /// Whether the transfer succeeded.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Caller-supplied description of a new job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Directory on the remote server.
    #[serde(default)]
    pub remote_dir: String,
    /// Directory on the local machine.
    #[serde(default)]
    pub local_dir: String,
    /// Name of the file to transfer.
    pub file_name: String,
    /// Transfer direction.
    pub direction: Direction,
    /// First eligible fire time. Past values are accepted.
    pub start_at: DateTime<Utc>,
    /// Milliseconds between recurrences; `0` means fire once.
    #[serde(default)]
    pub interval_ms: i64,
}

impl JobDescriptor {
    /// Create a one-shot descriptor with empty directories.
    pub fn new(file_name: impl Into<String>, direction: Direction, start_at: DateTime<Utc>) -> Self {
        Self {
            remote_dir: String::new(),
            local_dir: String::new(),
            file_name: file_name.into(),
            direction,
            start_at,
            interval_ms: 0,
        }
    }

    /// Set the remote and local directories.
    pub fn with_dirs(mut self, remote_dir: impl Into<String>, local_dir: impl Into<String>) -> Self {
        self.remote_dir = remote_dir.into();
        self.local_dir = local_dir.into();
        self
    }

    /// Set the recurrence interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX);
        self
    }

    /// Set the recurrence interval in raw milliseconds.
    pub fn with_interval_ms(mut self, interval_ms: i64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Check the descriptor and compute the first `next_run`.
    pub fn validate(&self) -> Result<(Duration, DateTime<Utc>), JobError> {
        if self.file_name.trim().is_empty() {
            return Err(JobError::EmptyFileName);
        }
        if self.interval_ms < 0 {
            return Err(JobError::NegativeInterval(self.interval_ms));
        }

        let next_run = TimeDelta::try_milliseconds(self.interval_ms)
            .and_then(|step| self.start_at.checked_add_signed(step))
            .ok_or(JobError::IntervalOutOfRange(self.interval_ms))?;

        Ok((Duration::from_millis(self.interval_ms as u64), next_run))
    }
}

/// A transfer job and its schedule bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    remote_dir: String,
    local_dir: String,
    file_name: String,
    direction: Direction,
    start_at: DateTime<Utc>,
    #[serde(rename = "interval_ms", with = "interval_millis")]
    interval: Duration,
    next_run: DateTime<Utc>,
    #[serde(default)]
    past_runs: Vec<RunRecord>,
    #[serde(default)]
    state: JobState,
}

impl Job {
    /// Build a new pending job from a validated descriptor.
    pub fn from_descriptor(id: JobId, descriptor: &JobDescriptor) -> Result<Self, JobError> {
        let (interval, next_run) = descriptor.validate()?;
        Ok(Self {
            id,
            remote_dir: descriptor.remote_dir.clone(),
            local_dir: descriptor.local_dir.clone(),
            file_name: descriptor.file_name.clone(),
            direction: descriptor.direction,
            start_at: descriptor.start_at,
            interval,
            next_run,
            past_runs: Vec::new(),
            state: JobState::Pending,
        })
    }

    /// Get the job ID.
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Get the remote directory.
    pub fn remote_dir(&self) -> &str {
        &self.remote_dir
    }

    /// Get the local directory.
    pub fn local_dir(&self) -> &str {
        &self.local_dir
    }

    /// Get the file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Get the transfer direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Get the first eligible fire time.
    pub fn start_at(&self) -> DateTime<Utc> {
        self.start_at
    }

    /// Get the recurrence interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the job reschedules itself after a fire.
    pub fn is_recurring(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Get the next scheduled fire time.
    pub fn next_run(&self) -> DateTime<Utc> {
        self.next_run
    }

    /// Get the past executions in fire order.
    pub fn past_runs(&self) -> &[RunRecord] {
        &self.past_runs
    }

    /// Get the scheduling state.
    pub fn state(&self) -> JobState {
        self.state
    }

    /// The instant the next timer should expire at.
    pub fn fire_at(&self) -> DateTime<Utc> {
        self.start_at.max(self.next_run)
    }

    /// Whether both `start_at` and `next_run` have already elapsed.
    ///
    /// Stale jobs are never armed.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.next_run < now && self.start_at < now
    }

    pub(crate) fn set_state(&mut self, state: JobState) {
        self.state = state;
    }

    pub(crate) fn clear_interval(&mut self) {
        self.interval = Duration::ZERO;
    }

    pub(crate) fn record_run(&mut self, record: RunRecord) {
        self.past_runs.push(record);
    }

    /// Move `next_run` forward by one interval.
    ///
    /// Returns `false` when the job is not recurring or the next time would
    /// overflow; `next_run` is left unchanged in that case.
    pub(crate) fn advance(&mut self) -> bool {
        if self.interval.is_zero() {
            return false;
        }
        let following = TimeDelta::from_std(self.interval)
            .ok()
            .and_then(|step| self.next_run.checked_add_signed(step));
        match following {
            Some(next) => {
                self.next_run = next;
                true
            }
            None => false,
        }
    }
}

mod interval_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
