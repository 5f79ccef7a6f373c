//! In-memory repository implementation.
//!
//! Provides a thread-safe in-memory backend for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{ConnectionRepository, RepositoryError};
use crate::core::connection::ConnectionRecord;
use crate::core::types::ConnectionId;

/// In-memory repository backend.
///
/// Thread-safe storage using RwLock for concurrent access.
/// Data is not persisted across restarts.
pub struct InMemoryRepository {
    records: RwLock<HashMap<ConnectionId, (u64, ConnectionRecord)>>,
    sequence: RwLock<u64>,
}

impl InMemoryRepository {
    /// Create a new empty in-memory repository.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            sequence: RwLock::new(0),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryRepository {
    async fn load(&self, id: &ConnectionId) -> Result<ConnectionRecord, RepositoryError> {
        let records = self
            .records
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        records
            .get(id)
            .map(|(_, record)| record.clone())
            .ok_or_else(|| RepositoryError::NotFound(format!("connection: {}", id)))
    }

    async fn save(&self, record: &ConnectionRecord) -> Result<(), RepositoryError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        // Replacing keeps the first insertion position.
        if let Some(entry) = records.get_mut(record.id()) {
            entry.1 = record.clone();
            return Ok(());
        }
        let mut sequence = self
            .sequence
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        *sequence += 1;
        records.insert(record.id().clone(), (*sequence, record.clone()));
        Ok(())
    }

    async fn delete(&self, id: &ConnectionId) -> Result<(), RepositoryError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        records
            .remove(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("connection: {}", id)))?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<ConnectionRecord>, RepositoryError> {
        let records = self
            .records
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let mut result: Vec<_> = records.values().cloned().collect();
        result.sort_by_key(|(seq, _)| *seq);
        Ok(result.into_iter().map(|(_, record)| record).collect())
    }

    async fn delete_all(&self) -> Result<(), RepositoryError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        records.clear();
        Ok(())
    }
}
