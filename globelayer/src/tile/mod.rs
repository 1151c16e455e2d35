//! Tiles of the quadtree pyramid.
//!
//! - [`TileAddress`] and [`Quadrant`] name cells of the pyramid.
//! - [`TileMesh`] generates the vertex grid of a tile.
//! - [`Tile`] is the renderable patch with its flat/terrain state machine.

mod address;
mod error;
mod mesh;
mod patch;

pub use address::{ancestor_elevation_level, Quadrant, TileAddress, MAX_ADDRESS_LEVEL};
pub use error::AddressError;
pub use mesh::TileMesh;
pub use patch::{TerrainContext, Tile, TileKind};
