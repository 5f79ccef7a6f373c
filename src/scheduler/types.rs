//! Scheduler type definitions.
//!
//! This module contains the error type and the outcome enums reported by the
//! scheduler's arm and cancel operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::job::{JobError, JobState};
use crate::storage::RepositoryError;

/// Errors that can occur in the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Job not found.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// Connection not found.
    #[error("connection not found: {0}")]
    ConnectionNotFound(String),

    /// An entity with this ID already exists.
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// The connection ID cannot be used.
    #[error("invalid connection id: {0:?}")]
    InvalidId(String),

    /// The job descriptor was rejected.
    #[error("invalid job: {0}")]
    Validation(#[from] JobError),

    /// No timer could be set for the job; it has been cancelled.
    #[error("failed to arm job {job_id}: {reason}")]
    ArmFailed { job_id: String, reason: String },

    /// Job store lock was poisoned.
    #[error("job store lock poisoned")]
    LockPoisoned,

    /// Repository error.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    /// The change was applied in memory but could not be written to the
    /// repository.
    #[error("change to {id} applied but not persisted: {source}")]
    NotPersisted {
        id: String,
        #[source]
        source: RepositoryError,
    },
}

/// Result of asking the scheduler to arm a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// A timer is set for `fire_at`.
    Armed { fire_at: DateTime<Utc> },
    /// The fire time had fully elapsed; the job stays pending.
    Skipped { next_run: DateTime<Utc> },
    /// The job was not pending, nothing changed.
    Unchanged(JobState),
}

/// Result of cancelling a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job will never fire again.
    Cancelled,
    /// A transfer is in flight; it completes and the job is not rescheduled.
    Deferred,
    /// The job had already finished.
    AlreadyFinished(JobState),
}
