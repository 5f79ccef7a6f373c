//! Testing utilities for users of the ferry library.
//!
//! This module provides stand-ins for the two external collaborators of the
//! scheduler:
//!
//! - [`RecordingExecutor`]: a transfer executor that records every request,
//!   optionally sleeps to simulate a slow transfer, and can be told to fail
//! - [`FailingRepository`]: a repository whose every operation fails
//!
//! # Example
//!
//! ```
//! use ferry::testing::RecordingExecutor;
//! use std::time::Duration;
//!
//! let executor = RecordingExecutor::new().with_delay(Duration::from_millis(50));
//! executor.fail_with("connection reset");
//! assert_eq!(executor.call_count(), 0);
//! ```

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::core::connection::{ConnectionProfile, ConnectionRecord};
use crate::core::types::{ConnectionId, JobId};
use crate::storage::{ConnectionRepository, RepositoryError};
use crate::transfer::{TransferError, TransferExecutor, TransferRequest};

/// A transfer executor that records what it was asked to do.
///
/// The call counter is bumped when a transfer starts, before the simulated
/// delay, so tests can detect an in-flight transfer.
#[derive(Default)]
pub struct RecordingExecutor {
    delay: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<TransferRequest>>,
    logins: Mutex<Vec<ConnectionId>>,
    failure: Mutex<Option<String>>,
    remote_entries: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    /// Create an executor that succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every transfer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Entries returned by directory listings.
    pub fn with_remote_entries(self, entries: Vec<String>) -> Self {
        if let Ok(mut slot) = self.remote_entries.lock() {
            *slot = entries;
        }
        self
    }

    /// Make every following call fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(message.into());
        }
    }

    /// Make following calls succeed again.
    pub fn succeed(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }

    /// Number of transfers started.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Transfers that have finished, in completion order.
    pub fn requests(&self) -> Vec<TransferRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// IDs of the jobs that have finished a transfer, in completion order.
    pub fn job_ids(&self) -> Vec<JobId> {
        self.requests()
            .iter()
            .map(|request| request.job.id().clone())
            .collect()
    }

    /// Connections that logged in, in order.
    pub fn logins(&self) -> Vec<ConnectionId> {
        self.logins.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn current_failure(&self) -> Option<String> {
        self.failure.lock().ok().and_then(|f| f.clone())
    }
}

#[async_trait]
impl TransferExecutor for RecordingExecutor {
    async fn execute(&self, request: &TransferRequest) -> Result<(), TransferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match self.current_failure() {
            Some(message) => Err(TransferError::Transfer {
                path: request.remote_path(),
                message,
            }),
            None => Ok(()),
        }
    }

    async fn connect(&self, profile: &ConnectionProfile) -> Result<(), TransferError> {
        if let Ok(mut logins) = self.logins.lock() {
            logins.push(profile.id.clone());
        }
        match self.current_failure() {
            Some(message) => Err(TransferError::Login {
                username: profile.username.clone(),
                message,
            }),
            None => Ok(()),
        }
    }

    async fn list(&self, profile: &ConnectionProfile, path: &str) -> Result<Vec<String>, TransferError> {
        match self.current_failure() {
            Some(message) => Err(TransferError::Connect {
                address: profile.server_address.clone(),
                message,
            }),
            None => {
                tracing::debug!(path = %path, "Listing recorded entries");
                Ok(self.remote_entries.lock().map(|e| e.clone()).unwrap_or_default())
            }
        }
    }
}

/// A repository whose every operation fails with [`RepositoryError::Other`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingRepository;

impl FailingRepository {
    /// Create a failing repository.
    pub fn new() -> Self {
        Self
    }

    fn failure() -> RepositoryError {
        RepositoryError::Other("injected repository failure".to_string())
    }
}

#[async_trait]
impl ConnectionRepository for FailingRepository {
    async fn load(&self, _id: &ConnectionId) -> Result<ConnectionRecord, RepositoryError> {
        Err(Self::failure())
    }

    async fn save(&self, _record: &ConnectionRecord) -> Result<(), RepositoryError> {
        Err(Self::failure())
    }

    async fn delete(&self, _id: &ConnectionId) -> Result<(), RepositoryError> {
        Err(Self::failure())
    }

    async fn load_all(&self) -> Result<Vec<ConnectionRecord>, RepositoryError> {
        Err(Self::failure())
    }

    async fn delete_all(&self) -> Result<(), RepositoryError> {
        Err(Self::failure())
    }
}
