//! Asynchronous texture loading.

use std::sync::Arc;

use moka::sync::Cache;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::{DecodedTexture, TextureError, TextureHandle};
use crate::provider::AsyncHttpClient;

/// Default decoded-texture cache size (256 MB).
pub const DEFAULT_TEXTURE_CACHE_BYTES: u64 = 256 * 1024 * 1024;

/// Produces texture handles for image URLs.
pub trait TextureLoader: Send + Sync {
    /// Starts loading `url` and returns a handle that completes later.
    fn load(&self, url: &str) -> TextureHandle;

    /// Drops any cached textures.
    fn clear(&self) {}
}

/// Decodes an encoded image (PNG, JPEG, ...) to RGBA8.
pub fn decode_texture(bytes: &[u8]) -> Result<DecodedTexture, TextureError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    Ok(DecodedTexture {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

/// Downloads and decodes textures over HTTP.
///
/// Decoded textures are cached by URL with size-based eviction.
pub struct HttpTextureLoader<C: AsyncHttpClient> {
    http_client: Arc<C>,
    cache: Cache<String, Arc<DecodedTexture>>,
}

impl<C: AsyncHttpClient> HttpTextureLoader<C> {
    pub fn new(http_client: C) -> Self {
        Self::with_capacity(http_client, DEFAULT_TEXTURE_CACHE_BYTES)
    }

    /// Creates a loader whose cache holds at most `max_bytes` of pixels.
    pub fn with_capacity(http_client: C, max_bytes: u64) -> Self {
        let cache = Cache::builder()
            .weigher(|_url: &String, texture: &Arc<DecodedTexture>| -> u32 {
                texture.rgba.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_bytes)
            .build();
        Self {
            http_client: Arc::new(http_client),
            cache,
        }
    }

    /// Number of cached textures.
    pub fn cached_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl<C: AsyncHttpClient> TextureLoader for HttpTextureLoader<C> {
    fn load(&self, url: &str) -> TextureHandle {
        if let Some(texture) = self.cache.get(url) {
            return TextureHandle::loaded(url, texture);
        }

        let handle = TextureHandle::loading(url);
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(url, "No async runtime, texture not loaded");
                handle.complete(Err(TextureError::NoRuntime));
                return handle;
            }
        };

        let client = Arc::clone(&self.http_client);
        let cache = self.cache.clone();
        let pending = handle.clone();
        let url = url.to_string();
        runtime.spawn(async move {
            let result = match client.get(&url).await {
                Ok(bytes) => decode_texture(&bytes).map(Arc::new),
                Err(e) => Err(TextureError::from(e)),
            };
            match &result {
                Ok(texture) => {
                    debug!(url = %url, width = texture.width, height = texture.height, "Texture loaded");
                    cache.insert(url, Arc::clone(texture));
                }
                Err(e) => warn!(url = %url, error = %e, "Texture load failed"),
            }
            pending.complete(result);
        });
        handle
    }

    fn clear(&self) {
        self.cache.invalidate_all();
    }
}

/// Loader that completes every handle immediately with a blank texture.
///
/// Used for headless runs without imagery.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderTextureLoader;

impl TextureLoader for PlaceholderTextureLoader {
    fn load(&self, url: &str) -> TextureHandle {
        TextureHandle::loaded(url, Arc::new(DecodedTexture::blank()))
    }
}
