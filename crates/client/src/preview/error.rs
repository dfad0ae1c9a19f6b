//! Metadata service error types.

use std::sync::Arc;

/// Errors from a link metadata service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PreviewError {
    /// Service answered with a non-success status.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for PreviewError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { PreviewError::Timeout } else { PreviewError::Network(Arc::new(err)) }
    }
}
