//! Point-in-time copy of the engine counters.

use std::fmt;

/// Counter values captured by [`GlobeMetrics::snapshot`](super::GlobeMetrics::snapshot).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub refreshes: u64,
    pub tiles_created: u64,
    pub tiles_destroyed: u64,
    pub terrain_builds: u64,
    pub flat_builds: u64,
    pub tiles_awaiting_elevation: u64,
    pub elevation_requests: u64,
    pub elevation_resolved: u64,
    pub elevation_failed: u64,
    pub elevation_dedup_hits: u64,
    pub gpu_allocation_failures: u64,
}

impl TelemetrySnapshot {
    /// Tiles currently alive according to the create/destroy counters.
    pub fn live_tiles(&self) -> u64 {
        self.tiles_created.saturating_sub(self.tiles_destroyed)
    }

    /// Elevation fetches neither resolved nor failed yet.
    pub fn elevation_in_flight(&self) -> u64 {
        self.elevation_requests
            .saturating_sub(self.elevation_resolved + self.elevation_failed)
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Refreshes:            {}", self.refreshes)?;
        writeln!(
            f,
            "Tiles:                {} live ({} created, {} destroyed)",
            self.live_tiles(),
            self.tiles_created,
            self.tiles_destroyed
        )?;
        writeln!(
            f,
            "Builds:               {} terrain, {} flat",
            self.terrain_builds, self.flat_builds
        )?;
        writeln!(f, "Awaiting elevation:   {}", self.tiles_awaiting_elevation)?;
        writeln!(
            f,
            "Elevation requests:   {} ({} resolved, {} failed, {} in flight, {} deduplicated)",
            self.elevation_requests,
            self.elevation_resolved,
            self.elevation_failed,
            self.elevation_in_flight(),
            self.elevation_dedup_hits
        )?;
        write!(f, "GPU alloc failures:   {}", self.gpu_allocation_failures)
    }
}
