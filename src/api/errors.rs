//! API error types and HTTP status mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::scheduler::SchedulerError;
use crate::storage::RepositoryError;
use crate::transfer::TransferError;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// The request was malformed or failed validation.
    BadRequest(String),
    /// Request conflict (e.g., duplicate ID).
    Conflict(String),
    /// The remote server could not be reached or rejected the request.
    BadGateway(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::JobNotFound(id) => ApiError::NotFound(format!("job not found: {}", id)),
            SchedulerError::ConnectionNotFound(id) => {
                ApiError::NotFound(format!("connection not found: {}", id))
            }
            SchedulerError::DuplicateId(id) => ApiError::Conflict(format!("duplicate id: {}", id)),
            err @ SchedulerError::InvalidId(_) => ApiError::BadRequest(err.to_string()),
            SchedulerError::Validation(e) => ApiError::BadRequest(e.to_string()),
            SchedulerError::Storage(e) => e.into(),
            err @ (SchedulerError::ArmFailed { .. }
            | SchedulerError::LockPoisoned
            | SchedulerError::NotPersisted { .. }) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ApiError::NotFound(msg),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Join(_) => ApiError::Internal(err.to_string()),
            _ => ApiError::BadGateway(err.to_string()),
        }
    }
}
