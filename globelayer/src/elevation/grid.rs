//! Elevation grids and the routines that derive per-tile grids from them.
//!
//! Elevation is fetched as an 81×81 sample grid for one tile of the
//! elevation pyramid. That grid spans the tile's 8×8 descendants three levels
//! down with 10 samples per descendant, so a tile one to three levels below the
//! fetched tile gets an exact 11×11 grid by striding through it
//! ([`extract_exact`]).
//!
//! Tiles deeper than that are served by repeated midpoint subdivision of an
//! exact 11×11 grid ([`refine_quadrant`], [`refine_path`]):
//!
//! ```text
//!  parent 11×11        quadrant 6×6         rows 6×11          final 11×11
//! ┌───────┬─────┐     ┌─────┐
//! │ TL    │ TR  │ ──► │ • • │  ──► insert  ──► • ◦ • ◦ •  ──►  insert row
//! │       │     │     │ • • │      column       ...              midpoints
//! ├───────┼─────┤     └─────┘      midpoints
//! │ BL    │ BR  │
//! └───────┴─────┘
//! ```
//!
//! No clamping or NaN filtering happens anywhere: a NaN source sample
//! propagates into every derived sample that touches it.

use crate::tile::{Quadrant, TileAddress};

/// Subdivisions per axis of a freshly fetched grid.
pub const FETCH_SEGMENT: usize = 80;

/// Samples per axis of a freshly fetched grid.
pub const FETCH_WIDTH: usize = FETCH_SEGMENT + 1;

/// Samples in a freshly fetched grid.
pub const FETCH_SAMPLE_COUNT: usize = FETCH_WIDTH * FETCH_WIDTH;

/// Subdivisions per axis of a per-tile grid.
pub const TILE_SEGMENT: usize = 10;

/// Samples per axis of a per-tile grid.
pub const TILE_WIDTH: usize = TILE_SEGMENT + 1;

/// Samples in a per-tile grid.
pub const TILE_SAMPLE_COUNT: usize = TILE_WIDTH * TILE_WIDTH;

/// Levels spanned by one fetched grid.
pub const LEVELS_PER_FETCH: u32 = 3;

/// Samples per axis of the quadrant sub-sample used by refinement.
const HALF_WIDTH: usize = TILE_SEGMENT / 2 + 1;

/// A square grid of elevation samples in row-major order, north row first.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    source_level: u32,
    values: Vec<f64>,
}

impl ElevationGrid {
    /// Wraps `values`, recording the pyramid level the data originated from.
    pub fn new(source_level: u32, values: Vec<f64>) -> Self {
        Self {
            source_level,
            values,
        }
    }

    /// Level of the fetched grid these samples were derived from.
    pub fn source_level(&self) -> u32 {
        self.source_level
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Samples per axis.
    pub fn width(&self) -> usize {
        (self.values.len() as f64).sqrt() as usize
    }

    /// Sample at `(row, column)`.
    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.values[row * self.width() + column]
    }
}

/// Copies a `TILE_WIDTH`×`TILE_WIDTH` window out of `source`.
///
/// The window starts at flattened index `start` and samples every `stride`-th
/// value along both axes.
pub fn extract_window(source: &[f64], source_width: usize, start: usize, stride: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(TILE_SAMPLE_COUNT);
    let mut row_start = start;
    for _ in 0..TILE_WIDTH {
        let mut idx = row_start;
        for _ in 0..TILE_WIDTH {
            out.push(source[idx]);
            idx += stride;
        }
        row_start += stride * source_width;
    }
    out
}

/// Extracts the exact 11×11 grid of `address` from the fetched grid of
/// `source_tile`.
///
/// `source` must hold [`FETCH_SAMPLE_COUNT`] samples and `address` must lie
/// one to three levels below `source_tile` inside it; otherwise `None`.
pub fn extract_exact(source: &[f64], source_tile: TileAddress, address: TileAddress) -> Option<Vec<f64>> {
    if source.len() != FETCH_SAMPLE_COUNT {
        return None;
    }
    let delta = address.level().checked_sub(source_tile.level())?;
    if !(1..=LEVELS_PER_FETCH).contains(&delta) || address.ancestor(source_tile.level())? != source_tile {
        return None;
    }

    let big_row = (address.row() - (source_tile.row() << delta)) as usize;
    let big_column = (address.column() - (source_tile.column() << delta)) as usize;
    let stride = 1usize << (LEVELS_PER_FETCH - delta);
    let start = big_row * stride * TILE_SEGMENT * FETCH_WIDTH + big_column * stride * TILE_SEGMENT;

    Some(extract_window(source, FETCH_WIDTH, start, stride))
}

/// Interpolates the 11×11 grid of a child tile from its parent's 11×11 grid.
///
/// Takes the 6×6 quadrant of `parent` covered by the child, inserts the
/// midpoint between each adjacent pair along every row (6×11), then between
/// each adjacent pair along every column (11×11).
///
/// # Panics
///
/// Panics if `parent` does not hold [`TILE_SAMPLE_COUNT`] samples.
pub fn refine_quadrant(parent: &[f64], quadrant: Quadrant) -> Vec<f64> {
    assert_eq!(parent.len(), TILE_SAMPLE_COUNT, "parent grid must be 11x11");

    let offset = HALF_WIDTH - 1;
    let start = quadrant.row_offset() as usize * offset * TILE_WIDTH
        + quadrant.column_offset() as usize * offset;

    let mut rows = Vec::with_capacity(HALF_WIDTH * TILE_WIDTH);
    for i in 0..HALF_WIDTH {
        let row = &parent[start + i * TILE_WIDTH..start + i * TILE_WIDTH + HALF_WIDTH];
        for (j, &value) in row.iter().enumerate() {
            if j > 0 {
                rows.push((row[j - 1] + value) / 2.0);
            }
            rows.push(value);
        }
    }

    let mut out = vec![0.0; TILE_SAMPLE_COUNT];
    for i in 0..HALF_WIDTH {
        for j in 0..TILE_WIDTH {
            let value = rows[i * TILE_WIDTH + j];
            if i > 0 {
                let above = rows[(i - 1) * TILE_WIDTH + j];
                out[(2 * i - 1) * TILE_WIDTH + j] = (above + value) / 2.0;
            }
            out[2 * i * TILE_WIDTH + j] = value;
        }
    }
    out
}

/// Applies [`refine_quadrant`] once per quadrant in `path`, outermost first.
///
/// An empty path returns the grid unchanged.
pub fn refine_path(grid: &[f64], path: &[Quadrant]) -> Vec<f64> {
    path.iter()
        .fold(grid.to_vec(), |current, &quadrant| refine_quadrant(&current, quadrant))
}

/// Quadrants leading from the ancestor at `from_level` down to `address`.
///
/// Returns an empty path when `from_level >= address.level()`.
pub fn quadrant_path(address: TileAddress, from_level: u32) -> Vec<Quadrant> {
    let mut path = Vec::new();
    let mut current = address;
    while current.level() > from_level {
        if let (Some(quadrant), Some(parent)) = (current.quadrant(), current.parent()) {
            path.push(quadrant);
            current = parent;
        } else {
            break;
        }
    }
    path.reverse();
    path
}
