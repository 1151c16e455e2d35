//! Elevation data: fetching, caching and per-tile grids.
//!
//! Elevation is fetched every third pyramid level starting at a base level
//! (7 by default). Each fetched 81×81 grid serves the tiles one to three
//! levels below it exactly; deeper tiles are interpolated from those exact
//! grids until their own fetch resolves.
//!
//! ```text
//! level  7 ── fetch (81×81) ──► exact 11×11 for levels 8, 9, 10
//! level 10 ── fetch (81×81) ──► exact 11×11 for levels 11, 12, 13
//!                               interpolated from level 10 until then
//! ```

mod cache;
mod error;
pub mod grid;
mod transport;

pub use cache::{ElevationCache, ElevationEntry};
pub use error::ElevationError;
pub use grid::ElevationGrid;
pub use transport::{
    parse_elevation_response, ArcGisElevationFetcher, BoxFuture, ElevationFetcher,
    DEFAULT_ELEVATION_URL,
};
