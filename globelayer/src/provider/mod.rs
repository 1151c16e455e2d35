//! HTTP plumbing and image sources.
//!
//! # Example
//!
//! ```ignore
//! use globelayer::provider::{AsyncReqwestClient, ImageSource, XyzImageSource};
//!
//! let http_client = AsyncReqwestClient::new()?;
//! let source = XyzImageSource::arcgis_world_imagery();
//! let url = source.image_url(address);
//! ```

mod http;
mod image;
mod types;

pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use image::{ImageSource, XyzImageSource, ARCGIS_WORLD_IMAGERY_URL};
pub use types::ProviderError;

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
