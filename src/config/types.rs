//! Configuration type definitions.
//!
//! Every section is optional in the file; missing sections take their
//! defaults.

use serde::{Deserialize, Serialize};

/// Global configuration (ferry.yaml).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FerryConfig {
    /// HTTP API settings.
    pub api: ApiSettings,
    /// Where connections are persisted.
    pub storage: StorageConfig,
    /// How transfers are performed.
    pub transfer: TransferConfig,
}

/// HTTP API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8565,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// In-memory storage (default, non-persistent).
    #[serde(rename = "memory")]
    #[default]
    Memory,
    /// One JSON document per connection.
    #[serde(rename = "json")]
    Json {
        /// Root directory of the document store.
        path: String,
    },
    /// SQLite storage.
    #[serde(rename = "sqlite")]
    Sqlite {
        /// Path to the database file.
        path: String,
    },
}

/// Transfer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Log transfers instead of performing them.
    pub dry_run: bool,
    /// Seconds allowed for connecting to a server.
    pub connect_timeout_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            connect_timeout_secs: 30,
        }
    }
}
