//! Owned GPU mesh buffers.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::tile::TileMesh;

/// Opaque id of an uploaded vertex/index buffer set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buf#{}", self.0)
    }
}

/// GPU resource errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    #[error("buffer allocation failed: {0}")]
    AllocationFailed(String),
}

/// Uploads meshes to and releases them from GPU memory.
pub trait MeshAllocator: Send + Sync {
    /// Uploads positions, indices and uvs of `mesh`.
    fn allocate(&self, mesh: &TileMesh) -> Result<BufferHandle, GpuError>;

    /// Frees buffers previously returned by [`allocate`](Self::allocate).
    fn release(&self, handle: BufferHandle);
}

/// Buffers of one uploaded mesh, released on drop.
pub struct MeshBuffers {
    handle: BufferHandle,
    index_count: usize,
    allocator: Arc<dyn MeshAllocator>,
}

impl MeshBuffers {
    /// Uploads `mesh` through `allocator`.
    pub fn upload(allocator: &Arc<dyn MeshAllocator>, mesh: &TileMesh) -> Result<Self, GpuError> {
        let handle = allocator.allocate(mesh)?;
        Ok(Self {
            handle,
            index_count: mesh.index_count(),
            allocator: Arc::clone(allocator),
        })
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }
}

impl fmt::Debug for MeshBuffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshBuffers")
            .field("handle", &self.handle)
            .field("index_count", &self.index_count)
            .finish()
    }
}

impl Drop for MeshBuffers {
    fn drop(&mut self) {
        self.allocator.release(self.handle);
    }
}
