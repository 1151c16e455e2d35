//! Atomic engine counters.

use std::sync::atomic::{AtomicU64, Ordering};

use super::TelemetrySnapshot;

/// Counters shared between the globe and its background fetch tasks.
///
/// All updates use relaxed ordering: counters are independent and only read
/// through [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct GlobeMetrics {
    refreshes: AtomicU64,
    tiles_created: AtomicU64,
    tiles_destroyed: AtomicU64,
    terrain_builds: AtomicU64,
    flat_builds: AtomicU64,
    tiles_awaiting_elevation: AtomicU64,
    elevation_requests: AtomicU64,
    elevation_resolved: AtomicU64,
    elevation_failed: AtomicU64,
    elevation_dedup_hits: AtomicU64,
    gpu_allocation_failures: AtomicU64,
}

impl GlobeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Globe and layers
    // =========================================================================

    pub fn refresh_completed(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tiles_created(&self, count: u64) {
        self.tiles_created.fetch_add(count, Ordering::Relaxed);
    }

    pub fn tiles_destroyed(&self, count: u64) {
        self.tiles_destroyed.fetch_add(count, Ordering::Relaxed);
    }

    // =========================================================================
    // Tiles
    // =========================================================================

    pub fn terrain_built(&self) {
        self.terrain_builds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flat_built(&self) {
        self.flat_builds.fetch_add(1, Ordering::Relaxed);
    }

    /// A terrain candidate was hidden because its elevation is not resolved.
    pub fn tile_awaiting_elevation(&self) {
        self.tiles_awaiting_elevation.fetch_add(1, Ordering::Relaxed);
    }

    pub fn gpu_allocation_failed(&self) {
        self.gpu_allocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    // =========================================================================
    // Elevation cache
    // =========================================================================

    pub fn elevation_requested(&self) {
        self.elevation_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn elevation_resolved(&self) {
        self.elevation_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn elevation_failed(&self) {
        self.elevation_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// A request found an existing entry and issued no fetch.
    pub fn elevation_dedup_hit(&self) {
        self.elevation_dedup_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies every counter.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            refreshes: self.refreshes.load(Ordering::Relaxed),
            tiles_created: self.tiles_created.load(Ordering::Relaxed),
            tiles_destroyed: self.tiles_destroyed.load(Ordering::Relaxed),
            terrain_builds: self.terrain_builds.load(Ordering::Relaxed),
            flat_builds: self.flat_builds.load(Ordering::Relaxed),
            tiles_awaiting_elevation: self.tiles_awaiting_elevation.load(Ordering::Relaxed),
            elevation_requests: self.elevation_requests.load(Ordering::Relaxed),
            elevation_resolved: self.elevation_resolved.load(Ordering::Relaxed),
            elevation_failed: self.elevation_failed.load(Ordering::Relaxed),
            elevation_dedup_hits: self.elevation_dedup_hits.load(Ordering::Relaxed),
            gpu_allocation_failures: self.gpu_allocation_failures.load(Ordering::Relaxed),
        }
    }
}
