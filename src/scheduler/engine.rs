//! Scheduler engine implementation.
//!
//! The scheduler drives each job through its state machine:
//!
//! ```text
//! Pending -> Armed -> Firing -> Armed | Cancelled | Expired
//! ```
//!
//! Every armed job owns one tokio task that sleeps until the fire time and
//! then calls back into the scheduler. The transfer itself runs outside the
//! store lock; the bookkeeping before and after it happens inside.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::Mutex;

use super::store::{JobStore, Slot};
use super::types::{ArmOutcome, CancelOutcome, SchedulerError};
use crate::core::connection::{ConnectionProfile, ConnectionRecord};
use crate::core::job::{Job, JobState, RunRecord};
use crate::core::types::{ConnectionId, JobId};
use crate::events::{Event, EventBus};
use crate::storage::{ConnectionRepository, RepositoryError};
use crate::transfer::{TransferExecutor, TransferRequest};

/// Everything the scheduler needs to know about one connection's jobs.
///
/// Shared between the connection façade and every timer task of the
/// connection.
pub struct JobContext {
    profile: Arc<ConnectionProfile>,
    store: JobStore,
    repository: Option<Arc<dyn ConnectionRepository>>,
    retired: AtomicBool,
    persist_lock: Mutex<()>,
}

impl JobContext {
    /// Create a context with an empty job store.
    pub fn new(
        profile: Arc<ConnectionProfile>,
        repository: Option<Arc<dyn ConnectionRepository>>,
    ) -> Self {
        Self {
            profile,
            store: JobStore::new(),
            repository,
            retired: AtomicBool::new(false),
            persist_lock: Mutex::new(()),
        }
    }

    /// Credentials of the connection.
    pub fn profile(&self) -> &Arc<ConnectionProfile> {
        &self.profile
    }

    /// The connection's jobs.
    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Whether the connection has been retired.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    /// Serializable snapshot of the connection and its jobs.
    pub fn record(&self) -> Result<ConnectionRecord, SchedulerError> {
        Ok(ConnectionRecord {
            profile: (*self.profile).clone(),
            jobs: self.store.list()?,
        })
    }

    /// Write the current snapshot to the repository.
    ///
    /// Does nothing without a repository or once the connection is retired.
    /// Snapshots are taken under a lock so a slower writer can never replace a
    /// newer snapshot with an older one.
    pub async fn persist(&self) -> Result<(), RepositoryError> {
        let Some(repository) = &self.repository else {
            return Ok(());
        };

        let _guard = self.persist_lock.lock().await;
        if self.is_retired() {
            return Ok(());
        }
        let record = self
            .record()
            .map_err(|e| RepositoryError::Other(e.to_string()))?;
        repository.save(&record).await
    }

    async fn retire(&self) {
        let _guard = self.persist_lock.lock().await;
        self.retired.store(true, Ordering::SeqCst);
    }
}

/// What happened when a slot was armed inside the critical section.
enum ArmAttempt {
    Armed(DateTime<Utc>),
    Skipped(DateTime<Utc>),
    Failed(String),
}

/// What happened to a job after its transfer returned.
enum Completion {
    Rescheduled(ArmAttempt),
    Expired,
    Cancelled,
}

/// Arms, fires and cancels jobs.
///
/// Cheap to clone; clones share the executor and event bus.
#[derive(Clone)]
pub struct Scheduler {
    executor: Arc<dyn TransferExecutor>,
    events: Arc<EventBus>,
}

impl Scheduler {
    /// Create a scheduler with its own event bus.
    pub fn new(executor: Arc<dyn TransferExecutor>) -> Self {
        Self {
            executor,
            events: Arc::new(EventBus::new()),
        }
    }

    /// Use a shared event bus.
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Get the event bus.
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Get the transfer executor.
    pub fn executor(&self) -> &Arc<dyn TransferExecutor> {
        &self.executor
    }

    /// Arm a pending job.
    ///
    /// A job whose `next_run` and `start_at` have both elapsed is not armed
    /// and stays pending. Jobs in any other state than pending are left
    /// untouched.
    pub async fn arm(
        &self,
        ctx: &Arc<JobContext>,
        id: &JobId,
    ) -> Result<ArmOutcome, SchedulerError> {
        let now = Utc::now();
        let attempt = ctx.store.with_slot(id, |slot| match slot.job.state() {
            JobState::Pending => Ok(self.arm_slot(ctx, slot, now)),
            other => Err(other),
        })?;

        match attempt {
            Ok(attempt) => self.report_arm(&ctx.profile.id, id, attempt).await,
            Err(state) => Ok(ArmOutcome::Unchanged(state)),
        }
    }

    /// Cancel a job. No fire starts after this returns.
    pub async fn cancel(
        &self,
        ctx: &JobContext,
        id: &JobId,
    ) -> Result<CancelOutcome, SchedulerError> {
        let outcome = ctx.store.with_slot(id, Slot::cancel)?;
        if outcome == CancelOutcome::Cancelled {
            self.events
                .emit(Event::job_cancelled(ctx.profile.id.clone(), id.clone()))
                .await;
        }
        Ok(outcome)
    }

    /// Cancel and remove a job.
    pub async fn remove(&self, ctx: &JobContext, id: &JobId) -> Result<Job, SchedulerError> {
        let (job, outcome) = ctx.store.take(id)?;
        if outcome == CancelOutcome::Cancelled {
            self.events
                .emit(Event::job_cancelled(ctx.profile.id.clone(), id.clone()))
                .await;
        }
        Ok(job)
    }

    /// Cancel every job of a connection and stop persisting it.
    pub async fn retire(&self, ctx: &JobContext) -> Result<(), SchedulerError> {
        ctx.retire().await;
        for (id, outcome) in ctx.store.cancel_all()? {
            if outcome == CancelOutcome::Cancelled {
                self.events
                    .emit(Event::job_cancelled(ctx.profile.id.clone(), id))
                    .await;
            }
        }
        Ok(())
    }

    /// Set a timer for the job in `slot`. Called with the store lock held.
    fn arm_slot(&self, ctx: &Arc<JobContext>, slot: &mut Slot, now: DateTime<Utc>) -> ArmAttempt {
        if slot.job.is_stale(now) {
            slot.job.set_state(JobState::Pending);
            return ArmAttempt::Skipped(slot.job.next_run());
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                slot.job.clear_interval();
                slot.job.set_state(JobState::Cancelled);
                return ArmAttempt::Failed(e.to_string());
            }
        };

        let fire_at = slot.job.fire_at();
        let delay = (fire_at - now).to_std().unwrap_or(Duration::ZERO);
        let scheduler = self.clone();
        let ctx = Arc::clone(ctx);
        let id = slot.job.id().clone();

        let timer = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.fire(ctx, id).await;
        });

        slot.timer = Some(timer.abort_handle());
        slot.job.set_state(JobState::Armed);
        ArmAttempt::Armed(fire_at)
    }

    async fn report_arm(
        &self,
        connection_id: &ConnectionId,
        id: &JobId,
        attempt: ArmAttempt,
    ) -> Result<ArmOutcome, SchedulerError> {
        match attempt {
            ArmAttempt::Armed(fire_at) => {
                self.events
                    .emit(Event::job_armed(connection_id.clone(), id.clone(), fire_at))
                    .await;
                Ok(ArmOutcome::Armed { fire_at })
            }
            ArmAttempt::Skipped(next_run) => {
                self.events
                    .emit(Event::job_skipped(connection_id.clone(), id.clone(), next_run))
                    .await;
                Ok(ArmOutcome::Skipped { next_run })
            }
            ArmAttempt::Failed(reason) => {
                self.events
                    .emit(Event::job_arm_failed(
                        connection_id.clone(),
                        id.clone(),
                        reason.clone(),
                    ))
                    .await;
                Err(SchedulerError::ArmFailed {
                    job_id: id.to_string(),
                    reason,
                })
            }
        }
    }

    /// Timer callback.
    async fn fire(self, ctx: Arc<JobContext>, id: JobId) {
        let connection_id = ctx.profile.id.clone();

        let snapshot = ctx.store.with_slot(&id, |slot| {
            if slot.job.state() != JobState::Armed {
                return None;
            }
            slot.timer = None;
            slot.job.set_state(JobState::Firing);
            Some(slot.job.clone())
        });
        let job = match snapshot {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::debug!(connection_id = %connection_id, job_id = %id, "Timer expired for a job that is no longer armed");
                return;
            }
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, job_id = %id, error = %e, "Timer expired for a removed job");
                return;
            }
        };

        let scheduled_for = job.next_run();
        tracing::debug!(connection_id = %connection_id, job_id = %id, scheduled_for = %scheduled_for, "Firing job");

        let started = Instant::now();
        let request = TransferRequest::new(Arc::clone(&ctx.profile), job);
        let error = self
            .executor
            .execute(&request)
            .await
            .err()
            .map(|e| e.to_string());
        let duration = started.elapsed();

        let now = Utc::now();
        let completion = ctx.store.with_slot(&id, |slot| {
            slot.job.record_run(RunRecord {
                scheduled_for,
                error: error.clone(),
            });

            if slot.cancel_requested {
                slot.cancel_requested = false;
                slot.job.set_state(JobState::Cancelled);
                Completion::Cancelled
            } else if slot.job.advance() {
                Completion::Rescheduled(self.arm_slot(&ctx, slot, now))
            } else {
                slot.job.set_state(JobState::Expired);
                Completion::Expired
            }
        });

        self.events
            .emit(Event::job_fired(
                connection_id.clone(),
                id.clone(),
                scheduled_for,
                error,
                duration,
            ))
            .await;

        match completion {
            Ok(Completion::Rescheduled(attempt)) => {
                // Arm failures are already reported through the event bus.
                let _ = self.report_arm(&connection_id, &id, attempt).await;
            }
            Ok(Completion::Expired) => {
                self.events
                    .emit(Event::job_expired(connection_id.clone(), id.clone()))
                    .await;
            }
            Ok(Completion::Cancelled) => {
                self.events
                    .emit(Event::job_cancelled(connection_id.clone(), id.clone()))
                    .await;
            }
            Err(_) => {
                tracing::debug!(connection_id = %connection_id, job_id = %id, "Job removed while its transfer was running");
                return;
            }
        }

        if let Err(e) = ctx.persist().await {
            tracing::warn!(connection_id = %connection_id, job_id = %id, error = %e, "Failed to persist connection after fire");
        }
    }
}
