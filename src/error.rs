//! Error types for the distributed cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::cache::DecodeError;
use crate::store::StoreError;

// == Cache Error Enum ==
/// Unified error type for cache operations and the HTTP gateway.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Requested expiration is already in the past or otherwise unusable
    #[error("Invalid expiration: {0}")]
    InvalidExpiration(String),

    /// A concurrent writer won the conditional write for this key
    #[error("Write conflict on key: {key}")]
    WriteConflict { key: String },

    /// A stored item could not be decoded into a cache entry
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The backing store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation was cancelled before its next store call
    #[error("Operation cancelled")]
    Cancelled,

    /// Cache options failed validation
    #[error("Invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::InvalidExpiration(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::WriteConflict { .. } => StatusCode::CONFLICT,
            CacheError::Cancelled | CacheError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Decode(_) | CacheError::InvalidConfig(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (CacheError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (CacheError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
            (
                CacheError::InvalidExpiration("past".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                CacheError::WriteConflict { key: "k".into() },
                StatusCode::CONFLICT,
            ),
            (CacheError::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
            (
                CacheError::Store(StoreError::Unavailable("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CacheError::Decode(DecodeError::MissingAttribute("content".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CacheError::InvalidConfig(vec!["blank".into()]),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_store_error_passes_through_unchanged() {
        let err: CacheError = StoreError::TableNotFound("t".into()).into();
        assert!(matches!(
            err,
            CacheError::Store(StoreError::TableNotFound(ref t)) if t == "t"
        ));
        assert_eq!(err.to_string(), "Table not found: t");
    }

    #[test]
    fn test_invalid_config_lists_every_failure() {
        let err = CacheError::InvalidConfig(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Invalid configuration: a; b");
    }
}
