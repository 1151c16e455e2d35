//! Tile textures.
//!
//! Every tile holds a [`TextureHandle`] for its base-color image. Handles are
//! created by a [`TextureLoader`] and complete asynchronously:
//!
//! ```text
//! ImageSource::image_url ──► TextureLoader::load ──► TextureHandle (Loading)
//!                                  │
//!                                  └─ spawned task: GET, decode ──► Loaded / Failed
//! ```
//!
//! A tile whose texture is still loading is not yet drawable; layers report
//! this through `all_loaded`.

mod error;
mod handle;
mod loader;

pub use error::TextureError;
pub use handle::{DecodedTexture, TextureHandle, TextureState};
pub use loader::{
    decode_texture, HttpTextureLoader, PlaceholderTextureLoader, TextureLoader,
    DEFAULT_TEXTURE_CACHE_BYTES,
};
