//! GlobeLayer - tiled level-of-detail virtual globe
//!
//! This library maintains a quadtree pyramid of imagery tiles, drapes
//! interpolated elevation grids over the finer levels, and keeps the resident
//! tile set in step with what a camera can see.
//!
//! # Layout
//!
//! - [`tile`] - tile addresses, mesh generation and the flat/terrain state machine
//! - [`elevation`] - elevation cache, grid interpolation and HTTP transport
//! - [`layer`] - per-level tile sets and reconciliation
//! - [`globe`] - the orchestrator and its background driver
//! - [`camera`], [`render`], [`provider`], [`texture`] - collaborator interfaces
//! - [`config`], [`logging`], [`telemetry`] - ambient concerns

pub mod camera;
pub mod config;
pub mod coord;
pub mod elevation;
pub mod globe;
pub mod layer;
pub mod logging;
pub mod provider;
pub mod render;
pub mod telemetry;
pub mod texture;
pub mod tile;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
