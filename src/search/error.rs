//! Error types for document store operations

use crate::error::AppError;

/// Result type for document store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while talking to the document store
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The store answered with 429 or a 5xx status
    #[error("Store unavailable (status {status}): {reason}")]
    Unavailable { status: u16, reason: String },

    /// Credentials were missing or rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The search engine rejected the query
    #[error("Query rejected: {0}")]
    Query(String),

    /// Document or index does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A document with the same id already exists
    #[error("Document conflict: {0}")]
    Conflict(String),

    /// A caller-supplied search term was refused before reaching the store
    #[error("Invalid search term: {0}")]
    InvalidTerm(String),

    /// The store answered with something this client cannot interpret
    #[error("Unexpected response: {0}")]
    Response(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether repeating the request may succeed.
    ///
    /// Only transport failures and server-side unavailability qualify; a query
    /// the engine rejected will be rejected again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Connection(_) | StoreError::Timeout(_) | StoreError::Unavailable { .. }
        )
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            StoreError::Connection(err.to_string())
        } else if err.is_decode() {
            StoreError::Response(err.to_string())
        } else {
            StoreError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidTerm(msg) => AppError::Validation(msg),
            StoreError::Query(msg) => AppError::Query(msg),
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Timeout(msg) => AppError::Timeout(msg),
            StoreError::Configuration(msg) => AppError::Configuration(msg),
            StoreError::Serialization(msg) => AppError::Serialization(msg),
            err @ (StoreError::Connection(_)
            | StoreError::Unavailable { .. }
            | StoreError::Unauthorized(_)) => {
                AppError::Upstream(err.to_string())
            }
            err => AppError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::Connection("refused".into()).is_retryable());
        assert!(StoreError::Timeout("10s".into()).is_retryable());
        assert!(StoreError::Unavailable {
            status: 503,
            reason: "maintenance".into()
        }
        .is_retryable());

        assert!(!StoreError::Query("bad syntax".into()).is_retryable());
        assert!(!StoreError::Conflict("_design/search".into()).is_retryable());
        assert!(!StoreError::Unauthorized("no".into()).is_retryable());
    }

    #[test]
    fn test_app_error_mapping() {
        let err: AppError = StoreError::InvalidTerm("blank".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: AppError = StoreError::Unavailable {
            status: 502,
            reason: "down".into(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err: AppError = StoreError::Unauthorized("bad creds".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_code(), "UPSTREAM_ERROR");

        let err: AppError = StoreError::Conflict("_design/search".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
