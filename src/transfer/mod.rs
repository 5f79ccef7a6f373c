//! File transfer execution.
//!
//! The scheduler never talks to a server directly. When a job fires it hands a
//! [`TransferRequest`] to a [`TransferExecutor`], which performs the download
//! or upload and reports success or failure.
//!
//! Two executors ship with the crate:
//!
//! - [`FtpExecutor`]: talks FTP through `suppaftp` on a blocking thread
//! - [`DryRunExecutor`]: logs what would be transferred and always succeeds

mod dry_run;
mod ftp;

pub use dry_run::DryRunExecutor;
pub use ftp::FtpExecutor;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::core::connection::ConnectionProfile;
use crate::core::job::{Direction, Job};

/// Errors that can occur while transferring a file.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The server could not be reached.
    #[error("error connecting to {address}: {message}")]
    Connect { address: String, message: String },

    /// The server rejected the credentials.
    #[error("login failed for {username}: {message}")]
    Login { username: String, message: String },

    /// The server refused or aborted the transfer.
    #[error("transfer of {path} failed: {message}")]
    Transfer { path: String, message: String },

    /// Reading or writing the local file failed.
    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking transfer thread panicked or was cancelled.
    #[error("transfer task failed: {0}")]
    Join(String),
}

/// Everything an executor needs to move one file.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Credentials of the owning connection.
    pub profile: Arc<ConnectionProfile>,
    /// Snapshot of the job taken when it fired.
    pub job: Job,
}

impl TransferRequest {
    /// Create a new transfer request.
    pub fn new(profile: Arc<ConnectionProfile>, job: Job) -> Self {
        Self { profile, job }
    }

    /// Transfer direction.
    pub fn direction(&self) -> Direction {
        self.job.direction()
    }

    /// Path of the file on the remote server.
    pub fn remote_path(&self) -> String {
        join_remote(self.job.remote_dir(), self.job.file_name())
    }

    /// Path of the file on the local machine.
    pub fn local_path(&self) -> PathBuf {
        if self.job.local_dir().is_empty() {
            PathBuf::from(self.job.file_name())
        } else {
            PathBuf::from(self.job.local_dir()).join(self.job.file_name())
        }
    }
}

/// Join a remote directory and file name with exactly one `/`.
fn join_remote(dir: &str, file_name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", dir, file_name)
    }
}

/// Performs transfers and server-side checks for a connection.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    /// Run one download or upload.
    async fn execute(&self, request: &TransferRequest) -> Result<(), TransferError>;

    /// Connect to the server and authenticate, then hang up.
    async fn connect(&self, profile: &ConnectionProfile) -> Result<(), TransferError>;

    /// List entry names in a remote directory.
    async fn list(&self, profile: &ConnectionProfile, path: &str) -> Result<Vec<String>, TransferError>;
}
