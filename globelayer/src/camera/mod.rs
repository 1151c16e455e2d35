//! Camera collaborator.
//!
//! The globe asks its camera which tile addresses are needed at a level and
//! reads the camera pitch to decide terrain candidacy. Frustum culling itself
//! lives behind the [`Camera`] trait; [`FootprintCamera`] is a headless
//! implementation that selects a square footprint of tiles around a point.

mod footprint;

pub use footprint::{camera_distance, FootprintCamera};

use std::collections::BTreeSet;

use crate::tile::TileAddress;

/// Pitch of a camera looking straight down, in degrees.
pub const TOP_DOWN_PITCH: f64 = 90.0;

/// Largest visibility threshold the globe requests.
pub const MAX_VISIBILITY_THRESHOLD: f64 = 1.5;

/// Options for a visibility query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityOptions {
    /// Scale factor on the camera's footprint. Tilted cameras see further
    /// toward the horizon and pass values above 1.
    pub threshold: f64,
}

impl VisibilityOptions {
    /// Options for a camera at `pitch` degrees: `min(90 / pitch, 1.5)`.
    pub fn for_pitch(pitch: f64) -> Self {
        Self {
            threshold: (TOP_DOWN_PITCH / pitch).min(MAX_VISIBILITY_THRESHOLD),
        }
    }
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self { threshold: 1.0 }
    }
}

/// View onto the globe.
pub trait Camera: Send {
    /// Tile addresses at `level` the view needs.
    fn visible_tile_addresses(&self, level: u32, options: &VisibilityOptions) -> BTreeSet<TileAddress>;

    /// Tilt in degrees; 90 looks straight down.
    fn pitch_degrees(&self) -> f64;

    /// Moves the camera to the distance matching `level`.
    fn set_level(&mut self, level: u32);

    /// Column-major projection × view matrix.
    fn projection_view_matrix(&self) -> [f64; 16];
}
