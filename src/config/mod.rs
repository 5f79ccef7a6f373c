//! Configuration loading and parsing.
//!
//! This module provides YAML-based configuration for the API server, the
//! connection repository and the transfer executor.

mod error;
mod types;
mod yaml;

pub use error::ConfigError;
pub use types::{ApiSettings, FerryConfig, StorageConfig, TransferConfig};
pub use yaml::ConfigLoader;
