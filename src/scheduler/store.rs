//! Concurrency-safe job collection for one connection.
//!
//! Every read or write of a job's mutable fields (and of its timer handle)
//! happens inside the store's single critical section. The lock is a
//! `std::sync::Mutex`; callers must not hold it across an `.await`, which the
//! closure-based API makes impossible.

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::task::AbortHandle;

use super::types::{CancelOutcome, SchedulerError};
use crate::core::job::{Job, JobState};
use crate::core::types::JobId;

/// A job plus the transient scheduling data that lives beside it.
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) job: Job,
    pub(crate) timer: Option<AbortHandle>,
    pub(crate) cancel_requested: bool,
    seq: u64,
}

impl Slot {
    /// Stop the timer and make the job non-recurring.
    pub(crate) fn cancel(&mut self) -> CancelOutcome {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        let state = self.job.state();
        if state.is_terminal() {
            return CancelOutcome::AlreadyFinished(state);
        }

        self.job.clear_interval();
        if state == JobState::Firing {
            self.cancel_requested = true;
            CancelOutcome::Deferred
        } else {
            self.job.set_state(JobState::Cancelled);
            CancelOutcome::Cancelled
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<JobId, Slot>,
    next_seq: u64,
}

/// Map of job ID to job, safe to share between timers and request handlers.
#[derive(Debug, Default)]
pub struct JobStore {
    inner: Mutex<Inner>,
}

impl JobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, SchedulerError> {
        self.inner.lock().map_err(|_| SchedulerError::LockPoisoned)
    }

    /// Insert a job. Fails if the ID is already present.
    pub fn add(&self, job: Job) -> Result<JobId, SchedulerError> {
        let mut inner = self.lock()?;
        let id = job.id().clone();
        if inner.slots.contains_key(&id) {
            return Err(SchedulerError::DuplicateId(id.to_string()));
        }

        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.slots.insert(
            id.clone(),
            Slot {
                job,
                timer: None,
                cancel_requested: false,
                seq,
            },
        );
        Ok(id)
    }

    /// Snapshot of one job.
    pub fn get(&self, id: &JobId) -> Result<Job, SchedulerError> {
        self.with_slot(id, |slot| slot.job.clone())
    }

    /// Run `f` on one job inside the critical section.
    pub fn mutate<R>(&self, id: &JobId, f: impl FnOnce(&mut Job) -> R) -> Result<R, SchedulerError> {
        self.with_slot(id, |slot| f(&mut slot.job))
    }

    pub(crate) fn with_slot<R>(
        &self,
        id: &JobId,
        f: impl FnOnce(&mut Slot) -> R,
    ) -> Result<R, SchedulerError> {
        let mut inner = self.lock()?;
        let slot = inner
            .slots
            .get_mut(id)
            .ok_or_else(|| SchedulerError::JobNotFound(id.to_string()))?;
        Ok(f(slot))
    }

    /// Cancel and remove a job in one critical section.
    pub(crate) fn take(&self, id: &JobId) -> Result<(Job, CancelOutcome), SchedulerError> {
        let mut inner = self.lock()?;
        let mut slot = inner
            .slots
            .remove(id)
            .ok_or_else(|| SchedulerError::JobNotFound(id.to_string()))?;
        let outcome = slot.cancel();
        Ok((slot.job, outcome))
    }

    /// Remove a job, stopping its timer first.
    pub fn remove(&self, id: &JobId) -> Result<Job, SchedulerError> {
        self.take(id).map(|(job, _)| job)
    }

    /// Snapshots of every job in insertion order.
    pub fn list(&self) -> Result<Vec<Job>, SchedulerError> {
        let inner = self.lock()?;
        let mut slots: Vec<&Slot> = inner.slots.values().collect();
        slots.sort_by_key(|slot| slot.seq);
        Ok(slots.into_iter().map(|slot| slot.job.clone()).collect())
    }

    /// Cancel every job. Returns the outcome per job in insertion order.
    pub fn cancel_all(&self) -> Result<Vec<(JobId, CancelOutcome)>, SchedulerError> {
        let mut inner = self.lock()?;
        let mut slots: Vec<&mut Slot> = inner.slots.values_mut().collect();
        slots.sort_by_key(|slot| slot.seq);
        Ok(slots
            .into_iter()
            .map(|slot| (slot.job.id().clone(), slot.cancel()))
            .collect())
    }

    /// Number of jobs.
    pub fn len(&self) -> Result<usize, SchedulerError> {
        Ok(self.lock()?.slots.len())
    }

    /// Whether the store holds no jobs.
    pub fn is_empty(&self) -> Result<bool, SchedulerError> {
        Ok(self.len()? == 0)
    }
}
