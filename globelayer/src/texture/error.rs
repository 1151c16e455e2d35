//! Error types for texture loading.

use std::fmt;

use crate::provider::ProviderError;

/// Errors that can occur while loading a tile texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// The image could not be downloaded.
    DownloadFailed(String),
    /// The downloaded bytes are not a decodable image.
    DecodeFailed(String),
    /// No async runtime was available to run the download.
    NoRuntime,
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::DownloadFailed(msg) => write!(f, "Download failed: {}", msg),
            TextureError::DecodeFailed(msg) => write!(f, "Decode failed: {}", msg),
            TextureError::NoRuntime => write!(f, "No async runtime available"),
        }
    }
}

impl std::error::Error for TextureError {}

impl From<ProviderError> for TextureError {
    fn from(err: ProviderError) -> Self {
        TextureError::DownloadFailed(err.to_string())
    }
}

impl From<image::ImageError> for TextureError {
    fn from(err: image::ImageError) -> Self {
        TextureError::DecodeFailed(err.to_string())
    }
}
