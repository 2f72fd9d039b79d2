//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::messaging::PublishError;
use crate::models::ErrorResponse;
use crate::source::SourceError;

// == Cache Error Enum ==
/// Unified error type for the cache server.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is empty or too long
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Primary source could not produce a value; nothing was cached
    #[error("Fetch failed: {0}")]
    Fetch(#[source] SourceError),

    /// Primary source rejected the write; no notification was sent
    #[error("Update failed: {0}")]
    Update(#[source] SourceError),

    /// The write succeeded but peers were not told to invalidate
    #[error("Invalidation broadcast failed, peers may serve stale data: {0}")]
    Publish(#[from] PublishError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            CacheError::Fetch(_) | CacheError::Update(_) => StatusCode::BAD_GATEWAY,
            CacheError::Publish(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, CacheError>;
