//! GPU-facing interfaces.
//!
//! The engine never talks to a graphics API. It uploads tile meshes through a
//! [`MeshAllocator`] and emits [`DrawCall`]s into a [`RenderTarget`]; a
//! renderer implements both. [`recording`] provides an in-memory backend for
//! headless runs and tests.
//!
//! GPU buffers are owned by exactly one tile through [`MeshBuffers`], which
//! releases them when dropped.

mod buffers;
pub mod recording;

pub use buffers::{BufferHandle, GpuError, MeshAllocator, MeshBuffers};
pub use recording::{RecordingAllocator, RecordingTarget, RenderEvent};

use crate::camera::Camera;
use crate::texture::TextureHandle;
use crate::tile::TileAddress;

/// One indexed draw of one tile.
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub address: TileAddress,
    pub buffer: BufferHandle,
    pub index_count: usize,
    pub texture: TextureHandle,
}

/// Receiver of draw calls and depth state changes.
pub trait RenderTarget {
    fn set_depth_test(&mut self, enabled: bool);
    fn clear_depth(&mut self);
    fn submit(&mut self, call: DrawCall);
}

/// Something that can emit draw calls for the current camera.
pub trait Drawable {
    fn draw(&self, camera: &dyn Camera, target: &mut dyn RenderTarget);
}
