//! ferry - recurring file transfers over FTP.
//!
//! Register connections (server address and credentials), attach jobs that
//! download or upload a file on a fixed interval, and let the scheduler arm,
//! fire and re-arm them.
//!
//! # Example
//!
//! ```no_run
//! use ferry::{ConnectionProfile, ConnectionRegistry, Direction, DryRunExecutor, JobDescriptor, Scheduler};
//! use chrono::Utc;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = Scheduler::new(Arc::new(DryRunExecutor::new()));
//! let registry = ConnectionRegistry::new(scheduler, None);
//!
//! let profile = ConnectionProfile::new("archive", "ftp.example.com:21", "user", "secret");
//! let connection = registry.create_connection(profile).await?;
//!
//! let descriptor = JobDescriptor::new("report.csv", Direction::Download, Utc::now())
//!     .with_dirs("/outgoing", "/var/spool/in")
//!     .with_interval(Duration::from_secs(3600));
//! let job_id = connection.create_job(&descriptor).await?;
//! # let _ = job_id;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod connection;
pub mod core;
pub mod events;
pub mod registry;
pub mod scheduler;
pub mod storage;
pub mod testing;
pub mod transfer;

pub use config::{ConfigError, ConfigLoader, FerryConfig, StorageConfig, TransferConfig};
pub use connection::Connection;
pub use core::connection::{ConnectionProfile, ConnectionRecord};
pub use core::job::{Direction, Job, JobDescriptor, JobError, JobState, RunRecord};
pub use core::types::{ConnectionId, JobId};
pub use events::{Event, EventBus, EventHandler, LoggingHandler};
pub use registry::{ConnectionRegistry, RestoreSummary};
pub use scheduler::{ArmOutcome, CancelOutcome, JobContext, JobStore, Scheduler, SchedulerError};
pub use storage::{ConnectionRepository, InMemoryRepository, JsonFileRepository, RepositoryError};
#[cfg(feature = "sqlite")]
pub use storage::SqliteRepository;
pub use transfer::{DryRunExecutor, FtpExecutor, TransferError, TransferExecutor, TransferRequest};
