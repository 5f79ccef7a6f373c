//! JSON file repository implementation.
//!
//! Each record is one pretty-printed JSON document at
//! `<root>/<collection>/<id>.json`. Writes go through a temporary file and a
//! rename so a crash never leaves a half-written document behind.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{CONNECTIONS_COLLECTION, ConnectionRepository, RepositoryError};
use crate::core::connection::ConnectionRecord;
use crate::core::types::ConnectionId;

const EXTENSION: &str = "json";

/// Document-per-file repository backend.
pub struct JsonFileRepository {
    dir: PathBuf,
}

impl JsonFileRepository {
    /// Open (or create) the connections collection under `root`.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        Self::with_collection(root, CONNECTIONS_COLLECTION).await
    }

    /// Open (or create) a named collection under `root`.
    pub async fn with_collection(
        root: impl AsRef<Path>,
        collection: &str,
    ) -> Result<Self, RepositoryError> {
        let dir = root.as_ref().join(collection);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Directory holding the collection's documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &ConnectionId) -> Result<PathBuf, RepositoryError> {
        if !id.is_valid() {
            return Err(RepositoryError::Other(format!("invalid connection id: {:?}", id.as_str())));
        }
        Ok(self.dir.join(format!("{}.{}", id.as_str(), EXTENSION)))
    }
}

fn not_found(id: &ConnectionId) -> impl FnOnce(std::io::Error) -> RepositoryError + '_ {
    move |e| {
        if e.kind() == ErrorKind::NotFound {
            RepositoryError::NotFound(format!("connection: {}", id))
        } else {
            RepositoryError::Io(e)
        }
    }
}

#[async_trait]
impl ConnectionRepository for JsonFileRepository {
    async fn load(&self, id: &ConnectionId) -> Result<ConnectionRecord, RepositoryError> {
        let path = self.path_for(id)?;
        let bytes = tokio::fs::read(&path).await.map_err(not_found(id))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, record: &ConnectionRecord) -> Result<(), RepositoryError> {
        let path = self.path_for(record.id())?;
        let tmp = path.with_extension("tmp");
        let bytes = serde_json::to_vec_pretty(record)?;

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, id: &ConnectionId) -> Result<(), RepositoryError> {
        let path = self.path_for(id)?;
        tokio::fs::remove_file(&path).await.map_err(not_found(id))
    }

    async fn load_all(&self) -> Result<Vec<ConnectionRecord>, RepositoryError> {
        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(&path).await?;
            records.push(serde_json::from_slice(&bytes)?);
        }
        Ok(records)
    }

    async fn delete_all(&self) -> Result<(), RepositoryError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}
