//! YAML configuration loader.

use std::path::Path;

use super::error::ConfigError;
use super::types::{FerryConfig, StorageConfig};

/// Loads and validates `ferry.yaml`.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<FerryConfig, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
                path: path.to_path_buf(),
                source,
            })?;

        let config: FerryConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlFileError {
                path: path.to_path_buf(),
                source,
            })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a file, or use defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<FerryConfig, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(FerryConfig::default()),
        }
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<FerryConfig, ConfigError> {
        let config: FerryConfig = serde_yaml::from_str(yaml)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration.
    pub fn validate(config: &FerryConfig) -> Result<(), ConfigError> {
        if config.api.host.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("api.host must not be empty".into()));
        }

        match &config.storage {
            StorageConfig::Memory => {}
            StorageConfig::Json { path } | StorageConfig::Sqlite { path } => {
                if path.trim().is_empty() {
                    return Err(ConfigError::InvalidConfig(
                        "storage.path must not be empty".into(),
                    ));
                }
            }
        }

        if config.transfer.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "transfer.connect_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}
