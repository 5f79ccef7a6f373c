//! SQLite repository implementation.
//!
//! Stores connection records as JSON documents in a single `documents` table
//! keyed by `(collection, id)`.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use super::{CONNECTIONS_COLLECTION, ConnectionRepository, RepositoryError};
use crate::core::connection::ConnectionRecord;
use crate::core::types::ConnectionId;

/// SQLite repository backend.
///
/// Provides persistent storage with automatic schema migration.
pub struct SqliteRepository {
    pool: SqlitePool,
    collection: String,
}

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

impl SqliteRepository {
    /// Open the database at `path`, creating the file if it doesn't exist.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path_str = path.as_ref().to_string_lossy();
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path_str))
            .map_err(db_error)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_error)?;

        Self::from_pool(pool).await
    }

    /// Create an in-memory SQLite database (useful for testing).
    pub async fn in_memory() -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(db_error)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(db_error)?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, RepositoryError> {
        let repo = Self {
            pool,
            collection: CONNECTIONS_COLLECTION.to_string(),
        };
        repo.run_migrations().await?;
        Ok(repo)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), RepositoryError> {
        let schema = include_str!("../../migrations/001_documents.sql");
        sqlx::raw_sql(schema)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("migration failed: {}", e)))?;
        Ok(())
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ConnectionRepository for SqliteRepository {
    async fn load(&self, id: &ConnectionId) -> Result<ConnectionRecord, RepositoryError> {
        let row: (String,) =
            sqlx::query_as("SELECT body FROM documents WHERE collection = ? AND id = ?")
                .bind(&self.collection)
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?
                .ok_or_else(|| RepositoryError::NotFound(format!("connection: {}", id)))?;

        Ok(serde_json::from_str(&row.0)?)
    }

    async fn save(&self, record: &ConnectionRecord) -> Result<(), RepositoryError> {
        let body = serde_json::to_string(record)?;
        let now = chrono::Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (collection, id)
            DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.collection)
        .bind(record.id().as_str())
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn delete(&self, id: &ConnectionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(&self.collection)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("connection: {}", id)));
        }
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<ConnectionRecord>, RepositoryError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT body FROM documents WHERE collection = ? ORDER BY rowid")
                .bind(&self.collection)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        rows.into_iter()
            .map(|row| serde_json::from_str(&row.0).map_err(RepositoryError::from))
            .collect()
    }

    async fn delete_all(&self) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM documents WHERE collection = ?")
            .bind(&self.collection)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}
