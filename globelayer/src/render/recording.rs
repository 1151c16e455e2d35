//! In-memory render backend.
//!
//! [`RecordingAllocator`] hands out sequential buffer ids and tracks which are
//! live; [`RecordingTarget`] stores every draw call and depth change. Both are
//! used by the headless CLI and by tests asserting on GPU resource lifetimes.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use super::{BufferHandle, DrawCall, GpuError, MeshAllocator, RenderTarget};
use crate::tile::TileMesh;

/// Allocator that records allocations instead of touching a GPU.
#[derive(Debug, Default)]
pub struct RecordingAllocator {
    next_id: AtomicU64,
    live: Mutex<HashSet<BufferHandle>>,
    allocations: AtomicU64,
    releases: AtomicU64,
    vertices: AtomicU64,
    failing: AtomicBool,
    fail_next: AtomicU64,
}

impl RecordingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following allocation fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes the next `count` allocations fail.
    pub fn fail_next(&self, count: u64) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Buffers allocated and not yet released.
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_live(&self, handle: BufferHandle) -> bool {
        self.live.lock().contains(&handle)
    }

    pub fn allocation_count(&self) -> u64 {
        self.allocations.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> u64 {
        self.releases.load(Ordering::SeqCst)
    }

    /// Vertices uploaded over the allocator's lifetime.
    pub fn uploaded_vertices(&self) -> u64 {
        self.vertices.load(Ordering::SeqCst)
    }
}

impl MeshAllocator for RecordingAllocator {
    fn allocate(&self, mesh: &TileMesh) -> Result<BufferHandle, GpuError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GpuError::AllocationFailed("allocator is failing".to_string()));
        }
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(GpuError::AllocationFailed("scheduled failure".to_string()));
        }
        let handle = BufferHandle(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.live.lock().insert(handle);
        self.allocations.fetch_add(1, Ordering::SeqCst);
        self.vertices
            .fetch_add(mesh.vertex_count() as u64, Ordering::SeqCst);
        trace!(buffer = %handle, vertices = mesh.vertex_count(), "Allocated mesh buffers");
        Ok(handle)
    }

    fn release(&self, handle: BufferHandle) {
        if self.live.lock().remove(&handle) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Depth state change or draw recorded by [`RecordingTarget`].
#[derive(Debug, Clone)]
pub enum RenderEvent {
    DepthTest(bool),
    ClearDepth,
    Draw(DrawCall),
}

/// Render target that keeps every event in order.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    events: Vec<RenderEvent>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RenderEvent] {
        &self.events
    }

    pub fn draw_calls(&self) -> impl Iterator<Item = &DrawCall> {
        self.events.iter().filter_map(|e| match e {
            RenderEvent::Draw(call) => Some(call),
            _ => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.draw_calls().count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl RenderTarget for RecordingTarget {
    fn set_depth_test(&mut self, enabled: bool) {
        self.events.push(RenderEvent::DepthTest(enabled));
    }

    fn clear_depth(&mut self) {
        self.events.push(RenderEvent::ClearDepth);
    }

    fn submit(&mut self, call: DrawCall) {
        self.events.push(RenderEvent::Draw(call));
    }
}
