//! Connection façade.
//!
//! A [`Connection`] ties a credential profile to its jobs and coordinates the
//! job store, the scheduler and the repository for every job operation.
//!
//! Repository failures never undo an in-memory change. They are reported as
//! [`SchedulerError::NotPersisted`] after the change has taken effect.

use std::sync::Arc;

use crate::core::connection::{ConnectionProfile, ConnectionRecord};
use crate::core::job::{Job, JobDescriptor, JobState};
use crate::core::types::{ConnectionId, JobId};
use crate::scheduler::{ArmOutcome, CancelOutcome, JobContext, Scheduler, SchedulerError};
use crate::storage::ConnectionRepository;
use crate::transfer::TransferError;

/// A live connection and its scheduled jobs.
pub struct Connection {
    ctx: Arc<JobContext>,
    scheduler: Scheduler,
}

impl Connection {
    /// Create a connection with no jobs.
    pub fn new(
        profile: ConnectionProfile,
        scheduler: Scheduler,
        repository: Option<Arc<dyn ConnectionRepository>>,
    ) -> Self {
        Self {
            ctx: Arc::new(JobContext::new(Arc::new(profile), repository)),
            scheduler,
        }
    }

    /// Get the connection ID.
    pub fn id(&self) -> &ConnectionId {
        &self.ctx.profile().id
    }

    /// Get the credential profile.
    pub fn profile(&self) -> &ConnectionProfile {
        self.ctx.profile()
    }

    /// Validate a descriptor, store the new job and arm it.
    ///
    /// A job whose fire time has already elapsed is stored but never armed.
    pub async fn create_job(&self, descriptor: &JobDescriptor) -> Result<JobId, SchedulerError> {
        let job = Job::from_descriptor(JobId::generate(), descriptor)?;
        let id = self.ctx.store().add(job)?;
        tracing::info!(connection_id = %self.id(), job_id = %id, file = %descriptor.file_name, direction = %descriptor.direction, "Job created");

        let armed = self.scheduler.arm(&self.ctx, &id).await;
        let persisted = self.persist(&id).await;
        armed?;
        persisted?;
        Ok(id)
    }

    /// Cancel a job. It stays listed but never fires again.
    pub async fn cancel_job(&self, id: &JobId) -> Result<CancelOutcome, SchedulerError> {
        let outcome = self.scheduler.cancel(&self.ctx, id).await?;
        tracing::info!(connection_id = %self.id(), job_id = %id, outcome = ?outcome, "Job cancel requested");
        self.persist(id).await?;
        Ok(outcome)
    }

    /// Cancel a job and drop it from the connection.
    pub async fn remove_job(&self, id: &JobId) -> Result<Job, SchedulerError> {
        let job = self.scheduler.remove(&self.ctx, id).await?;
        tracing::info!(connection_id = %self.id(), job_id = %id, "Job removed");
        self.persist(id).await?;
        Ok(job)
    }

    /// Snapshots of every job in creation order.
    pub fn list_jobs(&self) -> Result<Vec<Job>, SchedulerError> {
        self.ctx.store().list()
    }

    /// Snapshot of one job.
    pub fn get_job(&self, id: &JobId) -> Result<Job, SchedulerError> {
        self.ctx.store().get(id)
    }

    /// Dial the server and log in with the stored credentials.
    pub async fn connect_and_authenticate(&self) -> Result<(), TransferError> {
        self.scheduler.executor().connect(self.profile()).await
    }

    /// List entry names in a remote directory.
    pub async fn list_remote(&self, path: &str) -> Result<Vec<String>, TransferError> {
        self.scheduler.executor().list(self.profile(), path).await
    }

    /// Serializable snapshot of the connection.
    pub fn record(&self) -> Result<ConnectionRecord, SchedulerError> {
        self.ctx.record()
    }

    /// Cancel every job and stop persisting this connection.
    pub async fn retire(&self) -> Result<(), SchedulerError> {
        self.scheduler.retire(&self.ctx).await
    }

    /// Re-add a job loaded from the repository and arm it again.
    ///
    /// Timers are not durable; only the schedule is. A job that was armed or
    /// firing when it was saved comes back as pending.
    pub(crate) async fn restore_job(&self, mut job: Job) -> Result<ArmOutcome, SchedulerError> {
        if !job.state().is_terminal() {
            job.set_state(JobState::Pending);
        }
        let id = self.ctx.store().add(job)?;
        self.scheduler.arm(&self.ctx, &id).await
    }

    async fn persist(&self, id: &JobId) -> Result<(), SchedulerError> {
        self.ctx.persist().await.map_err(|source| {
            tracing::warn!(connection_id = %self.id(), job_id = %id, error = %source, "Failed to persist connection");
            SchedulerError::NotPersisted {
                id: id.to_string(),
                source,
            }
        })
    }
}
