//! Registry of live connections.
//!
//! The registry owns every [`Connection`] the process knows about, hands out
//! shared references to request handlers, and rebuilds the whole set from the
//! repository on startup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::connection::Connection;
use crate::core::connection::ConnectionProfile;
use crate::core::types::ConnectionId;
use crate::scheduler::{ArmOutcome, Scheduler, SchedulerError};
use crate::storage::{ConnectionRepository, RepositoryError};

/// Counts reported by [`ConnectionRegistry::restore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Connections loaded.
    pub connections: usize,
    /// Jobs with a live timer again.
    pub armed: usize,
    /// Jobs left pending because their fire time had elapsed.
    pub skipped: usize,
    /// Jobs that were already cancelled or expired.
    pub finished: usize,
    /// Jobs whose timer could not be set.
    pub failed: usize,
}

#[derive(Default)]
struct Entries {
    connections: HashMap<ConnectionId, (u64, Arc<Connection>)>,
    next_seq: u64,
}

/// Owns the live connections of the process.
pub struct ConnectionRegistry {
    entries: RwLock<Entries>,
    scheduler: Scheduler,
    repository: Option<Arc<dyn ConnectionRepository>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new(scheduler: Scheduler, repository: Option<Arc<dyn ConnectionRepository>>) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            scheduler,
            repository,
        }
    }

    /// Get the scheduler shared by all connections.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    fn insert(&self, connection: Arc<Connection>) -> Result<(), SchedulerError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| SchedulerError::LockPoisoned)?;
        let id = connection.id().clone();
        if entries.connections.contains_key(&id) {
            return Err(SchedulerError::DuplicateId(id.to_string()));
        }
        entries.next_seq += 1;
        let seq = entries.next_seq;
        entries.connections.insert(id, (seq, connection));
        Ok(())
    }

    /// Register a new connection and persist it.
    pub async fn create_connection(
        &self,
        profile: ConnectionProfile,
    ) -> Result<Arc<Connection>, SchedulerError> {
        if !profile.id.is_valid() {
            return Err(SchedulerError::InvalidId(profile.id.to_string()));
        }
        let connection = Arc::new(Connection::new(
            profile,
            self.scheduler.clone(),
            self.repository.clone(),
        ));
        self.insert(Arc::clone(&connection))?;
        tracing::info!(connection_id = %connection.id(), name = %connection.profile().name, "Connection created");

        if let Some(repository) = &self.repository {
            let record = connection.record()?;
            repository
                .save(&record)
                .await
                .map_err(|source| SchedulerError::NotPersisted {
                    id: connection.id().to_string(),
                    source,
                })?;
        }
        Ok(connection)
    }

    /// Look up a connection.
    pub fn get(&self, id: &ConnectionId) -> Result<Arc<Connection>, SchedulerError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| SchedulerError::LockPoisoned)?;
        entries
            .connections
            .get(id)
            .map(|(_, connection)| Arc::clone(connection))
            .ok_or_else(|| SchedulerError::ConnectionNotFound(id.to_string()))
    }

    /// Every connection in creation order.
    pub fn list(&self) -> Result<Vec<Arc<Connection>>, SchedulerError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| SchedulerError::LockPoisoned)?;
        let mut all: Vec<_> = entries.connections.values().collect();
        all.sort_by_key(|(seq, _)| *seq);
        Ok(all
            .into_iter()
            .map(|(_, connection)| Arc::clone(connection))
            .collect())
    }

    /// Number of registered connections.
    pub fn len(&self) -> Result<usize, SchedulerError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| SchedulerError::LockPoisoned)?;
        Ok(entries.connections.len())
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> Result<bool, SchedulerError> {
        Ok(self.len()? == 0)
    }

    /// Cancel a connection's jobs, drop it and delete its record.
    pub async fn delete_connection(&self, id: &ConnectionId) -> Result<(), SchedulerError> {
        let connection = {
            let mut entries = self
                .entries
                .write()
                .map_err(|_| SchedulerError::LockPoisoned)?;
            entries
                .connections
                .remove(id)
                .map(|(_, connection)| connection)
                .ok_or_else(|| SchedulerError::ConnectionNotFound(id.to_string()))?
        };

        connection.retire().await?;
        tracing::info!(connection_id = %id, "Connection deleted");

        if let Some(repository) = &self.repository {
            match repository.delete(id).await {
                Ok(()) | Err(RepositoryError::NotFound(_)) => {}
                Err(source) => {
                    return Err(SchedulerError::NotPersisted {
                        id: id.to_string(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Cancel every job of every connection. Used on shutdown.
    pub async fn retire_all(&self) -> Result<(), SchedulerError> {
        for connection in self.list()? {
            connection.retire().await?;
        }
        Ok(())
    }

    /// Load every stored connection and re-arm its jobs.
    ///
    /// Connections already registered are left alone. Jobs whose fire time
    /// elapsed while the process was down stay pending.
    pub async fn restore(&self) -> Result<RestoreSummary, SchedulerError> {
        let Some(repository) = &self.repository else {
            return Ok(RestoreSummary::default());
        };

        let mut summary = RestoreSummary::default();
        for record in repository.load_all().await? {
            if self.get(record.id()).is_ok() {
                tracing::debug!(connection_id = %record.id(), "Connection already loaded, skipping");
                continue;
            }

            let connection = Arc::new(Connection::new(
                record.profile,
                self.scheduler.clone(),
                self.repository.clone(),
            ));
            for job in record.jobs {
                let job_id = job.id().clone();
                match connection.restore_job(job).await {
                    Ok(ArmOutcome::Armed { .. }) => summary.armed += 1,
                    Ok(ArmOutcome::Skipped { .. }) => summary.skipped += 1,
                    Ok(ArmOutcome::Unchanged(_)) => summary.finished += 1,
                    Err(e) => {
                        tracing::error!(connection_id = %connection.id(), job_id = %job_id, error = %e, "Failed to restore job");
                        summary.failed += 1;
                    }
                }
            }

            self.insert(connection)?;
            summary.connections += 1;
        }

        tracing::info!(
            connections = summary.connections,
            armed = summary.armed,
            skipped = summary.skipped,
            "Restored connections from storage"
        );
        Ok(summary)
    }
}
