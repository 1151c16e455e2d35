//! Elevation transport errors.

use thiserror::Error;

use crate::provider::ProviderError;

/// Failures of a single elevation fetch.
///
/// These never leave the cache: a failed fetch is logged and its entry stays
/// pending.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElevationError {
    /// Connection, timeout or body read failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service answered with a non-success status.
    #[error("elevation service returned HTTP {0}")]
    Status(u16),

    /// The response was not the expected JSON document.
    #[error("malformed elevation response: {0}")]
    MalformedResponse(String),

    /// The sample array has the wrong length.
    #[error("expected {expected} elevation samples, got {actual}")]
    WrongSampleCount { expected: usize, actual: usize },

    /// The configured service URL does not parse.
    #[error("invalid elevation service URL: {0}")]
    InvalidUrl(String),
}

impl From<ProviderError> for ElevationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Status { status, .. } => ElevationError::Status(status),
            other => ElevationError::Http(other.to_string()),
        }
    }
}
