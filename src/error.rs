//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Store Error Enum ==
/// Unified error type for cache stores, persistent stores and repositories.
///
/// Absent entities are never reported through this type by the repositories;
/// lookups return `Option` instead. `NotFound` only exists for the HTTP layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connectivity failure against the persistent store
    #[error("Transient store error: {0}")]
    Transient(String),

    /// Persistent store call exceeded its deadline
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Write rejected by the persistent store (e.g. constraint violation)
    #[error("Permanent write error: {0}")]
    PermanentWrite(String),

    /// Cache backing store is closed or unreachable
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Write-behind queue reached its capacity
    #[error("Write-behind queue full (capacity {capacity})")]
    QueueFull {
        /// Configured maximum number of pending writes
        capacity: usize,
    },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    // == Retry Classification ==
    /// Returns true when repeating the operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Transient(_) | StoreError::Timeout(_) | StoreError::QueueFull { .. }
        )
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            StoreError::PermanentWrite(_) => StatusCode::CONFLICT,
            StoreError::QueueFull { .. } => StatusCode::TOO_MANY_REQUESTS,
            StoreError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            StoreError::Transient(_) | StoreError::CacheUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            StoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching layer.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::Transient("connection reset".into()).is_retryable());
        assert!(StoreError::Timeout(Duration::from_millis(50)).is_retryable());
        assert!(StoreError::QueueFull { capacity: 10 }.is_retryable());
        assert!(!StoreError::PermanentWrite("unique violation".into()).is_retryable());
        assert!(!StoreError::CacheUnavailable("closed".into()).is_retryable());
        assert!(!StoreError::InvalidRequest("bad".into()).is_retryable());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            StoreError::QueueFull { capacity: 3 }.to_string(),
            "Write-behind queue full (capacity 3)"
        );
        assert_eq!(
            StoreError::PermanentWrite("duplicate sku".into()).to_string(),
            "Permanent write error: duplicate sku"
        );
    }

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (StoreError::NotFound("7".into()), StatusCode::NOT_FOUND),
            (StoreError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (StoreError::PermanentWrite("x".into()), StatusCode::CONFLICT),
            (StoreError::QueueFull { capacity: 1 }, StatusCode::TOO_MANY_REQUESTS),
            (StoreError::Timeout(Duration::from_secs(1)), StatusCode::GATEWAY_TIMEOUT),
            (StoreError::Transient("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (StoreError::CacheUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (StoreError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
