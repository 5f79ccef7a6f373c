//! API request handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::core::connection::ConnectionProfile;
use crate::core::job::JobDescriptor;
use crate::core::types::{ConnectionId, JobId};
use crate::registry::ConnectionRegistry;

use super::errors::ApiError;
use super::responses::{
    CancelResponse, ConnectionDetailResponse, ConnectionListResponse, ConnectionResponse,
    FileListResponse, HealthResponse, JobListResponse, JobResponse, MessageResponse,
};

/// Shared application state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<ConnectionRegistry>,
}

impl ApiState {
    /// Create state over a registry.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

/// Body of a create-connection request.
#[derive(Debug, Deserialize)]
pub struct CreateConnectionRequest {
    /// Optional explicit ID; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub server_address: String,
    pub username: String,
    pub password: String,
}

/// Query parameters for the remote listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    #[serde(default)]
    pub path: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// List all connections.
pub async fn list_connections(
    State(state): State<ApiState>,
) -> Result<Json<ConnectionListResponse>, ApiError> {
    let connections: Vec<ConnectionResponse> = state
        .registry
        .list()?
        .iter()
        .map(|c| ConnectionResponse::from(c.as_ref()))
        .collect();
    let count = connections.len();
    Ok(Json(ConnectionListResponse { connections, count }))
}

/// Create a connection.
pub async fn create_connection(
    State(state): State<ApiState>,
    Json(request): Json<CreateConnectionRequest>,
) -> Result<(StatusCode, Json<ConnectionResponse>), ApiError> {
    if request.server_address.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "server_address must not be empty".to_string(),
        ));
    }

    let profile = match request.id.filter(|id| !id.trim().is_empty()) {
        Some(id) => ConnectionProfile::with_id(
            ConnectionId::new(id),
            request.name,
            request.server_address,
            request.username,
            request.password,
        ),
        None => ConnectionProfile::new(
            request.name,
            request.server_address,
            request.username,
            request.password,
        ),
    };

    let connection = state.registry.create_connection(profile).await?;
    Ok((
        StatusCode::CREATED,
        Json(ConnectionResponse::from(connection.as_ref())),
    ))
}

/// Get a connection with its jobs.
pub async fn get_connection(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ConnectionDetailResponse>, ApiError> {
    let connection = state.registry.get(&ConnectionId::new(id))?;
    let jobs = connection
        .list_jobs()?
        .iter()
        .map(JobResponse::from)
        .collect();
    Ok(Json(ConnectionDetailResponse {
        connection: ConnectionResponse::from(connection.as_ref()),
        jobs,
    }))
}

/// Delete a connection, cancelling its jobs.
pub async fn delete_connection(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = ConnectionId::new(id);
    state.registry.delete_connection(&id).await?;
    Ok(Json(MessageResponse {
        message: format!("connection {} deleted", id),
    }))
}

/// Connect and authenticate against the remote server.
pub async fn login(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let connection = state.registry.get(&ConnectionId::new(id))?;
    connection.connect_and_authenticate().await?;
    Ok(Json(MessageResponse {
        message: format!("logged in to {}", connection.profile().server_address),
    }))
}

/// List entries of a remote directory.
pub async fn list_files(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<FileListResponse>, ApiError> {
    let connection = state.registry.get(&ConnectionId::new(id))?;
    let entries = connection.list_remote(&query.path).await?;
    let count = entries.len();
    Ok(Json(FileListResponse {
        path: query.path,
        entries,
        count,
    }))
}

/// List a connection's jobs.
pub async fn list_jobs(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<JobListResponse>, ApiError> {
    let connection = state.registry.get(&ConnectionId::new(id))?;
    let jobs: Vec<JobResponse> = connection
        .list_jobs()?
        .iter()
        .map(JobResponse::from)
        .collect();
    let count = jobs.len();
    Ok(Json(JobListResponse { jobs, count }))
}

/// Create and schedule a job.
pub async fn create_job(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(descriptor): Json<JobDescriptor>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    let connection = state.registry.get(&ConnectionId::new(id))?;
    let job_id = connection.create_job(&descriptor).await?;
    let job = connection.get_job(&job_id)?;
    Ok((StatusCode::CREATED, Json(JobResponse::from(&job))))
}

/// Get one job.
pub async fn get_job(
    State(state): State<ApiState>,
    Path((id, job_id)): Path<(String, String)>,
) -> Result<Json<JobResponse>, ApiError> {
    let connection = state.registry.get(&ConnectionId::new(id))?;
    let job = connection.get_job(&JobId::new(job_id))?;
    Ok(Json(JobResponse::from(&job)))
}

/// Cancel a job without removing it.
pub async fn cancel_job(
    State(state): State<ApiState>,
    Path((id, job_id)): Path<(String, String)>,
) -> Result<Json<CancelResponse>, ApiError> {
    let connection = state.registry.get(&ConnectionId::new(id))?;
    let job_id = JobId::new(job_id);
    let outcome = connection.cancel_job(&job_id).await?;
    let job = connection.get_job(&job_id)?;
    Ok(Json(CancelResponse::new(outcome, &job)))
}

/// Cancel and remove a job.
pub async fn delete_job(
    State(state): State<ApiState>,
    Path((id, job_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let connection = state.registry.get(&ConnectionId::new(id))?;
    let job_id = JobId::new(job_id);
    connection.remove_job(&job_id).await?;
    Ok(Json(MessageResponse {
        message: format!("job {} removed", job_id),
    }))
}
