//! Repository abstraction for persisting connections.
//!
//! Connections (with their jobs) are stored as JSON documents addressed by
//! connection ID. Backends are pluggable: in-memory, one-file-per-document
//! on disk, and SQLite.

mod json;
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use json::JsonFileRepository;
pub use memory::InMemoryRepository;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::connection::ConnectionRecord;
use crate::core::types::ConnectionId;

/// Collection name used for connection documents.
pub const CONNECTIONS_COLLECTION: &str = "connections";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested record was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Repository lock was poisoned.
    #[error("repository lock poisoned")]
    LockPoisoned,

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),

    /// Generic repository error.
    #[error("repository error: {0}")]
    Other(String),
}

/// Load/save/delete connection records by ID.
///
/// Implementations are not transactional across records; callers that need
/// ordered writes serialize them themselves.
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Load one connection.
    async fn load(&self, id: &ConnectionId) -> Result<ConnectionRecord, RepositoryError>;

    /// Insert or replace a connection.
    async fn save(&self, record: &ConnectionRecord) -> Result<(), RepositoryError>;

    /// Delete one connection.
    async fn delete(&self, id: &ConnectionId) -> Result<(), RepositoryError>;

    /// Load every stored connection.
    async fn load_all(&self) -> Result<Vec<ConnectionRecord>, RepositoryError>;

    /// Delete every stored connection.
    async fn delete_all(&self) -> Result<(), RepositoryError>;
}
