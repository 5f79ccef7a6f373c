//! Executor that only logs.

use async_trait::async_trait;

use super::{TransferError, TransferExecutor, TransferRequest};
use crate::core::connection::ConnectionProfile;
use crate::core::job::Direction;

/// Logs each transfer instead of performing it. Always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunExecutor;

impl DryRunExecutor {
    /// Create a new dry-run executor.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransferExecutor for DryRunExecutor {
    async fn execute(&self, request: &TransferRequest) -> Result<(), TransferError> {
        match request.direction() {
            Direction::Download => tracing::info!(
                connection_id = %request.profile.id,
                job_id = %request.job.id(),
                remote = %request.remote_path(),
                local = %request.local_path().display(),
                "Dry run: downloading file"
            ),
            Direction::Upload => tracing::info!(
                connection_id = %request.profile.id,
                job_id = %request.job.id(),
                remote = %request.remote_path(),
                local = %request.local_path().display(),
                "Dry run: uploading file"
            ),
        }
        Ok(())
    }

    async fn connect(&self, profile: &ConnectionProfile) -> Result<(), TransferError> {
        tracing::info!(connection_id = %profile.id, address = %profile.server_address, "Dry run: login");
        Ok(())
    }

    async fn list(&self, profile: &ConnectionProfile, path: &str) -> Result<Vec<String>, TransferError> {
        tracing::info!(connection_id = %profile.id, path = %path, "Dry run: listing directory");
        Ok(Vec::new())
    }
}
