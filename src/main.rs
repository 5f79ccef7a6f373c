//! ferry - recurring file transfers over FTP.
//!
//! Usage:
//!   ferry serve [--config ferry.yaml]     Restore connections and serve the HTTP API
//!   ferry validate <config>               Validate a configuration file
//!   ferry list [--config ferry.yaml]      List stored connections and their jobs

use clap::{Parser, Subcommand};
use ferry::api::{ApiConfig, ApiState, start_server};
use ferry::{
    ConfigLoader, ConnectionRegistry, ConnectionRepository, DryRunExecutor, EventBus,
    FerryConfig, FtpExecutor, InMemoryRepository, JsonFileRepository, LoggingHandler,
    RepositoryError, Scheduler, StorageConfig, TransferConfig, TransferExecutor,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// ferry - recurring file transfers over FTP
#[derive(Parser)]
#[command(name = "ferry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore stored connections, arm their jobs and serve the HTTP API
    Serve {
        /// Path to the configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Host to bind to (overrides the configuration file)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides the configuration file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Log transfers instead of performing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a configuration file without running
    Validate {
        /// Path to the configuration file
        #[arg(value_name = "FILE")]
        config: PathBuf,
    },

    /// List stored connections and their jobs
    List {
        /// Path to the configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            dry_run,
        } => {
            let mut config = ConfigLoader::load_or_default(config.as_deref())?;
            if let Some(host) = host {
                config.api.host = host;
            }
            if let Some(port) = port {
                config.api.port = port;
            }
            config.transfer.dry_run |= dry_run;
            serve(config).await?;
        }
        Commands::Validate { config } => {
            validate_config(&config)?;
        }
        Commands::List { config } => {
            let config = ConfigLoader::load_or_default(config.as_deref())?;
            list_connections(&config).await?;
        }
    }

    Ok(())
}

/// Open the repository named by the storage configuration.
async fn open_repository(
    config: &StorageConfig,
) -> Result<Arc<dyn ConnectionRepository>, RepositoryError> {
    match config {
        StorageConfig::Memory => Ok(Arc::new(InMemoryRepository::new())),
        StorageConfig::Json { path } => Ok(Arc::new(JsonFileRepository::new(path).await?)),
        #[cfg(feature = "sqlite")]
        StorageConfig::Sqlite { path } => {
            Ok(Arc::new(ferry::SqliteRepository::new(path).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageConfig::Sqlite { .. } => Err(RepositoryError::Other(
            "sqlite storage requires the `sqlite` feature".to_string(),
        )),
    }
}

/// Build the transfer executor named by the transfer configuration.
fn build_executor(config: &TransferConfig) -> Arc<dyn TransferExecutor> {
    if config.dry_run {
        Arc::new(DryRunExecutor::new())
    } else {
        Arc::new(
            FtpExecutor::new().with_connect_timeout(Duration::from_secs(config.connect_timeout_secs)),
        )
    }
}

/// Restore connections and serve the API until Ctrl+C.
async fn serve(config: FerryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(&config.storage).await?;
    if matches!(config.storage, StorageConfig::Memory) {
        warn!("Using in-memory storage; connections are lost on exit");
    }

    let event_bus = Arc::new(EventBus::new());
    event_bus.register(Arc::new(LoggingHandler)).await;

    let executor = build_executor(&config.transfer);
    if config.transfer.dry_run {
        info!("Dry run enabled, transfers are only logged");
    }

    let scheduler = Scheduler::new(executor).with_event_bus(event_bus);
    let registry = Arc::new(ConnectionRegistry::new(scheduler, Some(repository)));

    let summary = registry.restore().await?;
    if summary.skipped > 0 {
        warn!(
            "{} job(s) had already passed their fire time and were not armed",
            summary.skipped
        );
    }

    let server = start_server(ApiConfig::from(&config.api), ApiState::new(Arc::clone(&registry))).await?;
    info!("Press Ctrl+C to stop");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
        _ = server => {
            error!("API server stopped");
        }
    }

    registry.retire_all().await?;
    info!("Goodbye!");
    Ok(())
}

/// Validate a configuration file without running.
fn validate_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Validating configuration: {}", path.display());

    match ConfigLoader::load(path) {
        Ok(config) => {
            info!("Configuration is valid:");
            info!("  API: {}:{}", config.api.host, config.api.port);
            info!("  Storage: {:?}", config.storage);
            info!(
                "  Transfers: {}",
                if config.transfer.dry_run {
                    "dry run"
                } else {
                    "ftp"
                }
            );
            Ok(())
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            Err(e.into())
        }
    }
}

/// List stored connections and their jobs.
async fn list_connections(config: &FerryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(&config.storage).await?;
    let records = repository.load_all().await?;

    if records.is_empty() {
        println!("No stored connections");
        return Ok(());
    }

    for record in &records {
        println!("ID: {}", record.id());
        println!("  Name: {}", record.profile.name);
        println!("  Server: {}", record.profile.server_address);
        println!("  User: {}", record.profile.username);
        println!("  Jobs: {}", record.jobs.len());

        for job in &record.jobs {
            let every = if job.is_recurring() {
                format!("every {:?}", job.interval())
            } else {
                "once".to_string()
            };
            println!(
                "    - {} {} {} ({}, next run {}, {} past run(s), {:?})",
                job.id(),
                job.direction(),
                job.file_name(),
                every,
                job.next_run(),
                job.past_runs().len(),
                job.state()
            );
        }

        println!();
    }

    Ok(())
}
