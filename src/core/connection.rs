//! Connection endpoint descriptor and persisted record.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::job::Job;
use super::types::ConnectionId;

/// Credentials and address of a remote transfer endpoint.
///
/// Immutable after construction and shared read-only between the façade and
/// every timer of the connection.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Unique connection identifier.
    pub id: ConnectionId,
    /// Human-readable name.
    pub name: String,
    /// `host:port` of the remote server.
    pub server_address: String,
    /// Login user.
    pub username: String,
    /// Login password.
    pub password: String,
}

impl ConnectionProfile {
    /// Create a profile with a freshly generated ID.
    pub fn new(
        name: impl Into<String>,
        server_address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::with_id(
            ConnectionId::generate(),
            name,
            server_address,
            username,
            password,
        )
    }

    /// Create a profile with an explicit ID.
    pub fn with_id(
        id: ConnectionId,
        name: impl Into<String>,
        server_address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            server_address: server_address.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("server_address", &self.server_address)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Serializable snapshot of a connection and its jobs.
///
/// This is the document the repository stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Endpoint descriptor.
    #[serde(flatten)]
    pub profile: ConnectionProfile,
    /// Jobs in insertion order.
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl ConnectionRecord {
    /// Create a record with no jobs.
    pub fn new(profile: ConnectionProfile) -> Self {
        Self {
            profile,
            jobs: Vec::new(),
        }
    }

    /// Get the connection ID.
    pub fn id(&self) -> &ConnectionId {
        &self.profile.id
    }
}
