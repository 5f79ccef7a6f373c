//! Job lifecycle events and event handling.
//!
//! The scheduler reports every state transition of a job through the
//! [`EventBus`]. This is also how arm failures reach whoever watches job state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::types::{ConnectionId, JobId};

/// Lifecycle events emitted by the scheduler.
#[derive(Debug, Clone)]
pub enum Event {
    /// A timer was set for the job.
    JobArmed {
        connection_id: ConnectionId,
        job_id: JobId,
        fire_at: DateTime<Utc>,
        timestamp: Instant,
    },

    /// The job's fire time had already elapsed, so no timer was set.
    JobSkipped {
        connection_id: ConnectionId,
        job_id: JobId,
        next_run: DateTime<Utc>,
        timestamp: Instant,
    },

    /// The job fired and its transfer finished.
    JobFired {
        connection_id: ConnectionId,
        job_id: JobId,
        scheduled_for: DateTime<Utc>,
        success: bool,
        error: Option<String>,
        duration: Duration,
        timestamp: Instant,
    },

    /// The job was cancelled by a caller.
    JobCancelled {
        connection_id: ConnectionId,
        job_id: JobId,
        timestamp: Instant,
    },

    /// The job fired with a zero interval and will not run again.
    JobExpired {
        connection_id: ConnectionId,
        job_id: JobId,
        timestamp: Instant,
    },

    /// No timer could be set; the job is cancelled.
    JobArmFailed {
        connection_id: ConnectionId,
        job_id: JobId,
        error: String,
        timestamp: Instant,
    },
}

impl Event {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::JobArmed { timestamp, .. } => *timestamp,
            Event::JobSkipped { timestamp, .. } => *timestamp,
            Event::JobFired { timestamp, .. } => *timestamp,
            Event::JobCancelled { timestamp, .. } => *timestamp,
            Event::JobExpired { timestamp, .. } => *timestamp,
            Event::JobArmFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job the event refers to.
    pub fn job_id(&self) -> &JobId {
        match self {
            Event::JobArmed { job_id, .. }
            | Event::JobSkipped { job_id, .. }
            | Event::JobFired { job_id, .. }
            | Event::JobCancelled { job_id, .. }
            | Event::JobExpired { job_id, .. }
            | Event::JobArmFailed { job_id, .. } => job_id,
        }
    }

    /// Create a JobArmed event.
    pub fn job_armed(connection_id: ConnectionId, job_id: JobId, fire_at: DateTime<Utc>) -> Self {
        Event::JobArmed {
            connection_id,
            job_id,
            fire_at,
            timestamp: Instant::now(),
        }
    }

    /// Create a JobSkipped event.
    pub fn job_skipped(connection_id: ConnectionId, job_id: JobId, next_run: DateTime<Utc>) -> Self {
        Event::JobSkipped {
            connection_id,
            job_id,
            next_run,
            timestamp: Instant::now(),
        }
    }

    /// Create a JobFired event.
    pub fn job_fired(
        connection_id: ConnectionId,
        job_id: JobId,
        scheduled_for: DateTime<Utc>,
        error: Option<String>,
        duration: Duration,
    ) -> Self {
        Event::JobFired {
            connection_id,
            job_id,
            scheduled_for,
            success: error.is_none(),
            error,
            duration,
            timestamp: Instant::now(),
        }
    }

    /// Create a JobCancelled event.
    pub fn job_cancelled(connection_id: ConnectionId, job_id: JobId) -> Self {
        Event::JobCancelled {
            connection_id,
            job_id,
            timestamp: Instant::now(),
        }
    }

    /// Create a JobExpired event.
    pub fn job_expired(connection_id: ConnectionId, job_id: JobId) -> Self {
        Event::JobExpired {
            connection_id,
            job_id,
            timestamp: Instant::now(),
        }
    }

    /// Create a JobArmFailed event.
    pub fn job_arm_failed(connection_id: ConnectionId, job_id: JobId, error: String) -> Self {
        Event::JobArmFailed {
            connection_id,
            job_id,
            error,
            timestamp: Instant::now(),
        }
    }
}

/// Handler for receiving lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: &Event);
}

/// Event bus for distributing events to registered handlers.
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// Create a new event bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an event handler.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);
    }

    /// Emit an event to all registered handlers.
    pub async fn emit(&self, event: Event) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Get the number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event handler that writes job lifecycle events to the log.
pub struct LoggingHandler;

#[async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: &Event) {
        match event {
            Event::JobArmed {
                connection_id,
                job_id,
                fire_at,
                ..
            } => {
                tracing::debug!(connection_id = %connection_id, job_id = %job_id, fire_at = %fire_at, "Job armed");
            }
            Event::JobSkipped {
                connection_id,
                job_id,
                next_run,
                ..
            } => {
                tracing::warn!(connection_id = %connection_id, job_id = %job_id, next_run = %next_run, "Job fire time already elapsed, not arming");
            }
            Event::JobFired {
                connection_id,
                job_id,
                scheduled_for,
                error,
                duration,
                ..
            } => match error {
                None => {
                    tracing::info!(connection_id = %connection_id, job_id = %job_id, scheduled_for = %scheduled_for, "Transfer completed in {:?}", duration);
                }
                Some(e) => {
                    tracing::warn!(connection_id = %connection_id, job_id = %job_id, scheduled_for = %scheduled_for, error = %e, "Transfer failed after {:?}", duration);
                }
            },
            Event::JobCancelled {
                connection_id,
                job_id,
                ..
            } => {
                tracing::info!(connection_id = %connection_id, job_id = %job_id, "Job cancelled");
            }
            Event::JobExpired {
                connection_id,
                job_id,
                ..
            } => {
                tracing::info!(connection_id = %connection_id, job_id = %job_id, "One-shot job finished");
            }
            Event::JobArmFailed {
                connection_id,
                job_id,
                error,
                ..
            } => {
                tracing::error!(connection_id = %connection_id, job_id = %job_id, error = %error, "Failed to arm job");
            }
        }
    }
}
