//! Error types for the cache drivers
//!
//! Provides unified error handling using thiserror. Driver operations never
//! return these: a miss is `None` and a rejected write is `false`. They are
//! raised at construction time and by the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Stash Error Enum ==
/// Unified error type for driver construction and the HTTP surface.
#[derive(Error, Debug)]
pub enum StashError {
    /// Invalid driver options
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Backend cannot be constructed on this host
    #[error("Driver unavailable: {0}")]
    Unavailable(String),

    /// Nothing cached under the requested path
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The backend rejected a write
    #[error("Backend failure: {0}")]
    Backend(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for StashError {
    fn into_response(self) -> Response {
        let status = match &self {
            StashError::NotFound(_) => StatusCode::NOT_FOUND,
            StashError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            StashError::Backend(_) | StashError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StashError::Configuration(_) | StashError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache drivers.
pub type Result<T> = std::result::Result<T, StashError>;
