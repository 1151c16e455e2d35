//! Provider error types.

use thiserror::Error;

/// Errors raised by HTTP-backed sources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Client construction, connection or body read failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The URL template could not be expanded.
    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),
}
