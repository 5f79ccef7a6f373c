//! HTTP API module for the ferry scheduler.
//!
//! Provides JSON endpoints for managing connections and their transfer jobs.

mod errors;
mod handlers;
mod responses;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::{ApiState, CreateConnectionRequest, ListFilesQuery};
pub use responses::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiSettings;

/// Configuration for the API server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::from(&ApiSettings::default())
    }
}

impl From<&ApiSettings> for ApiConfig {
    fn from(settings: &ApiSettings) -> Self {
        Self::new(settings.host.clone(), settings.port)
    }
}

impl ApiConfig {
    /// Create a new API config with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the socket address.
    pub fn socket_addr(&self) -> std::io::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    }
}

/// Build the API router with all endpoints.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(handlers::health))
        // Connections
        .route("/api/v1/connections", get(handlers::list_connections))
        .route("/api/v1/connection", post(handlers::create_connection))
        .route(
            "/api/v1/connection/{id}",
            get(handlers::get_connection).delete(handlers::delete_connection),
        )
        .route("/api/v1/connection/{id}/login", post(handlers::login))
        .route("/api/v1/connection/{id}/files", get(handlers::list_files))
        // Jobs
        .route(
            "/api/v1/connection/{id}/jobs",
            get(handlers::list_jobs).post(handlers::create_job),
        )
        .route(
            "/api/v1/connection/{id}/job/{job_id}",
            get(handlers::get_job).delete(handlers::delete_job),
        )
        .route(
            "/api/v1/connection/{id}/job/{job_id}/cancel",
            post(handlers::cancel_job),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Start the API server.
///
/// This function spawns the server and returns a handle to the task.
/// The server runs until the task is aborted or the process exits.
pub async fn start_server(
    config: ApiConfig,
    state: ApiState,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let router = build_router(state);
    let addr = config.socket_addr()?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("API server listening on http://{}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(handle)
}
