//! Shared per-tile texture state.

use std::sync::Arc;

use parking_lot::RwLock;

use super::TextureError;

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTexture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedTexture {
    /// A 1×1 opaque white texture.
    pub fn blank() -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        }
    }
}

/// Loading state of a texture.
#[derive(Debug, Clone)]
pub enum TextureState {
    Loading,
    Loaded(Arc<DecodedTexture>),
    Failed(TextureError),
}

/// Handle onto a texture that may still be loading.
///
/// Clones share the same state. The loader completes the handle from its
/// background task; tiles only read it.
#[derive(Debug, Clone)]
pub struct TextureHandle {
    url: Arc<str>,
    state: Arc<RwLock<TextureState>>,
}

impl TextureHandle {
    /// A handle that is still loading.
    pub fn loading(url: &str) -> Self {
        Self::with_state(url, TextureState::Loading)
    }

    /// A handle that is already loaded.
    pub fn loaded(url: &str, texture: Arc<DecodedTexture>) -> Self {
        Self::with_state(url, TextureState::Loaded(texture))
    }

    fn with_state(url: &str, state: TextureState) -> Self {
        Self {
            url: Arc::from(url),
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> TextureState {
        self.state.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.read(), TextureState::Loaded(_))
    }

    /// Loaded or failed; no further change will happen.
    pub fn is_settled(&self) -> bool {
        !matches!(*self.state.read(), TextureState::Loading)
    }

    pub fn texture(&self) -> Option<Arc<DecodedTexture>> {
        match &*self.state.read() {
            TextureState::Loaded(texture) => Some(Arc::clone(texture)),
            _ => None,
        }
    }

    pub(crate) fn complete(&self, result: Result<Arc<DecodedTexture>, TextureError>) {
        *self.state.write() = match result {
            Ok(texture) => TextureState::Loaded(texture),
            Err(e) => TextureState::Failed(e),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let handle = TextureHandle::loading("a.png");
        let clone = handle.clone();
        assert!(!clone.is_settled());

        handle.complete(Ok(Arc::new(DecodedTexture::blank())));
        assert!(clone.is_loaded());
        assert_eq!(clone.texture().unwrap().width, 1);
        assert_eq!(clone.url(), "a.png");
    }

    #[test]
    fn test_failed_is_settled_but_not_loaded() {
        let handle = TextureHandle::loading("b.png");
        handle.complete(Err(TextureError::NoRuntime));
        assert!(handle.is_settled());
        assert!(!handle.is_loaded());
        assert!(matches!(handle.state(), TextureState::Failed(TextureError::NoRuntime)));
    }
}
