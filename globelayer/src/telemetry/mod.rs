//! Engine telemetry.
//!
//! Lock-free atomic counters updated by the globe, its layers and the
//! elevation cache, plus point-in-time snapshots for display.
//!
//! ```text
//! Globe / SubLayer / Tile ─┐
//!                          ├──► GlobeMetrics ──► TelemetrySnapshot ──► CLI
//! ElevationCache tasks ────┘    (atomics)        (copy)
//! ```
//!
//! # Example
//!
//! ```
//! use globelayer::telemetry::GlobeMetrics;
//!
//! let metrics = GlobeMetrics::new();
//! metrics.refresh_completed();
//! metrics.tiles_created(4);
//! assert_eq!(metrics.snapshot().tiles_created, 4);
//! ```

mod metrics;
mod snapshot;

pub use metrics::GlobeMetrics;
pub use snapshot::TelemetrySnapshot;
