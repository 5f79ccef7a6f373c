//! FTP executor backed by `suppaftp`.
//!
//! `suppaftp`'s synchronous client is driven on tokio's blocking pool, one
//! session per call: dial, login, binary mode, transfer, quit. Downloads are
//! streamed into `<file>.part` and renamed into place once the server
//! confirms the transfer.

use async_trait::async_trait;
use std::fs::File;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use suppaftp::{FtpError, FtpStream};
use suppaftp::types::FileType;

use super::{TransferError, TransferExecutor, TransferRequest};
use crate::core::connection::ConnectionProfile;
use crate::core::job::Direction;

const DEFAULT_FTP_PORT: u16 = 21;

/// Default time allowed for the TCP connect.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transfers files over plain FTP.
#[derive(Debug, Clone)]
pub struct FtpExecutor {
    connect_timeout: Duration,
}

impl FtpExecutor {
    /// Create an executor with the default connect timeout.
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Get the connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Default for FtpExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve(address: &str) -> Result<SocketAddr, TransferError> {
    let connect_error = |message: String| TransferError::Connect {
        address: address.to_string(),
        message,
    };

    let with_port = if address.rsplit_once(':').is_some_and(|(_, port)| port.parse::<u16>().is_ok()) {
        address.to_string()
    } else {
        format!("{}:{}", address, DEFAULT_FTP_PORT)
    };

    with_port
        .to_socket_addrs()
        .map_err(|e| connect_error(e.to_string()))?
        .next()
        .ok_or_else(|| connect_error("address resolved to nothing".to_string()))
}

/// Dial and authenticate a new session.
fn open_session(profile: &ConnectionProfile, timeout: Duration) -> Result<FtpStream, TransferError> {
    let addr = resolve(&profile.server_address)?;
    let mut stream =
        FtpStream::connect_timeout(addr, timeout).map_err(|e| TransferError::Connect {
            address: profile.server_address.clone(),
            message: e.to_string(),
        })?;

    stream
        .login(profile.username.as_str(), profile.password.as_str())
        .map_err(|e| TransferError::Login {
            username: profile.username.clone(),
            message: e.to_string(),
        })?;

    Ok(stream)
}

fn close_session(mut stream: FtpStream) {
    if let Err(e) = stream.quit() {
        tracing::debug!(error = %e, "FTP quit failed");
    }
}

fn partial_path(local: &Path) -> PathBuf {
    let mut name = local.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Stream `remote` into `local` without holding the file in memory.
fn download(stream: &mut FtpStream, remote: &str, local: &Path) -> Result<(), TransferError> {
    let partial = partial_path(local);
    let mut file = File::create(&partial)?;

    let result = stream
        .retr(remote, |reader| {
            std::io::copy(reader, &mut file).map_err(FtpError::ConnectionError)
        })
        .map_err(|e| TransferError::Transfer {
            path: remote.to_string(),
            message: e.to_string(),
        })
        .and_then(|bytes| {
            file.sync_all()?;
            Ok(bytes)
        });
    drop(file);

    match result {
        Ok(bytes) => {
            std::fs::rename(&partial, local)?;
            tracing::debug!(remote = %remote, bytes, "Download complete");
            Ok(())
        }
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(&partial) {
                tracing::debug!(path = %partial.display(), error = %cleanup, "Could not remove partial download");
            }
            Err(e)
        }
    }
}

fn transfer_blocking(request: &TransferRequest, timeout: Duration) -> Result<(), TransferError> {
    let remote = request.remote_path();
    let local = request.local_path();
    let transfer_error = |message: String| TransferError::Transfer {
        path: remote.clone(),
        message,
    };

    let mut stream = open_session(&request.profile, timeout)?;
    stream
        .transfer_type(FileType::Binary)
        .map_err(|e| transfer_error(e.to_string()))?;

    let result = match request.direction() {
        Direction::Download => download(&mut stream, &remote, &local),
        Direction::Upload => File::open(&local)
            .map_err(TransferError::from)
            .and_then(|mut file| {
                stream
                    .put_file(&remote, &mut file)
                    .map(|_| ())
                    .map_err(|e| transfer_error(e.to_string()))
            }),
    };

    close_session(stream);
    result
}

async fn run_blocking<T, F>(f: F) -> Result<T, TransferError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TransferError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TransferError::Join(e.to_string()))?
}

#[async_trait]
impl TransferExecutor for FtpExecutor {
    async fn execute(&self, request: &TransferRequest) -> Result<(), TransferError> {
        tracing::debug!(
            job_id = %request.job.id(),
            direction = %request.direction(),
            remote = %request.remote_path(),
            "Starting FTP transfer"
        );
        let request = request.clone();
        let timeout = self.connect_timeout;
        run_blocking(move || transfer_blocking(&request, timeout)).await
    }

    async fn connect(&self, profile: &ConnectionProfile) -> Result<(), TransferError> {
        let profile = profile.clone();
        let timeout = self.connect_timeout;
        run_blocking(move || {
            let stream = open_session(&profile, timeout)?;
            close_session(stream);
            Ok(())
        })
        .await
    }

    async fn list(&self, profile: &ConnectionProfile, path: &str) -> Result<Vec<String>, TransferError> {
        let profile = profile.clone();
        let path = path.to_string();
        let timeout = self.connect_timeout;
        run_blocking(move || {
            let mut stream = open_session(&profile, timeout)?;
            let dir = if path.is_empty() { None } else { Some(path.as_str()) };
            let names = stream.nlst(dir).map_err(|e| TransferError::Transfer {
                path: path.clone(),
                message: e.to_string(),
            });
            close_session(stream);
            names
        })
        .await
    }
}
