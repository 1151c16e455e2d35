//! HTTP client abstraction for testability

use std::future::Future;
use std::time::Duration;

use super::types::ProviderError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Trait for asynchronous HTTP client operations.
///
/// Elevation and texture fetches run as spawned tokio tasks, so the returned
/// future must be `Send`. Mock clients implement this in tests.
pub trait AsyncHttpClient: Send + Sync + 'static {
    /// Performs an HTTP GET request and returns the response body.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;
}

/// Real HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::HttpError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| ProviderError::HttpError(format!("Failed to read response: {}", e)))
    }
}
