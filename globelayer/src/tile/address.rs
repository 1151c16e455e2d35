//! Quadtree tile addresses.
//!
//! A [`TileAddress`] names one cell of the tile pyramid by `(level, row, column)`.
//! Level 0 is a single tile covering the whole Mercator square; every level
//! below splits each tile into four quadrants.
//!
//! # Example
//!
//! ```
//! use globelayer::tile::{Quadrant, TileAddress};
//!
//! let tile = TileAddress::new(10, 5, 9).unwrap();
//! assert_eq!(tile.ancestor(7), Some(TileAddress::new(7, 0, 1).unwrap()));
//! assert_eq!(tile.quadrant(), Some(Quadrant::BottomRight));
//! assert_eq!(tile.to_string(), "10_5_9");
//! ```

use std::fmt;

use crate::coord::{tiles_per_axis, GeoEnvelope, MercatorEnvelope};
use crate::tile::AddressError;

/// Deepest level an address may have.
///
/// Keeps `2^level` representable in a `u32` row/column index.
pub const MAX_ADDRESS_LEVEL: u32 = 30;

/// Position of a tile inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Quadrant {
    /// All quadrants in row-major order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    /// Row offset (0 or 1) of this quadrant inside the parent.
    pub fn row_offset(self) -> u32 {
        match self {
            Quadrant::TopLeft | Quadrant::TopRight => 0,
            Quadrant::BottomLeft | Quadrant::BottomRight => 1,
        }
    }

    /// Column offset (0 or 1) of this quadrant inside the parent.
    pub fn column_offset(self) -> u32 {
        match self {
            Quadrant::TopLeft | Quadrant::BottomLeft => 0,
            Quadrant::TopRight | Quadrant::BottomRight => 1,
        }
    }

    fn from_offsets(row_offset: u32, column_offset: u32) -> Self {
        match (row_offset, column_offset) {
            (0, 0) => Quadrant::TopLeft,
            (0, _) => Quadrant::TopRight,
            (_, 0) => Quadrant::BottomLeft,
            _ => Quadrant::BottomRight,
        }
    }
}

/// Immutable `(level, row, column)` address of a pyramid tile.
///
/// Construct through [`TileAddress::new`], which enforces
/// `row, column < 2^level`. Ordering is by level, then row, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    level: u32,
    row: u32,
    column: u32,
}

impl TileAddress {
    /// Creates a validated address.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError`] when the level exceeds [`MAX_ADDRESS_LEVEL`] or
    /// the row/column fall outside the level's grid.
    pub fn new(level: u32, row: u32, column: u32) -> Result<Self, AddressError> {
        if level > MAX_ADDRESS_LEVEL {
            return Err(AddressError::LevelTooDeep {
                level,
                max: MAX_ADDRESS_LEVEL,
            });
        }
        let size = tiles_per_axis(level);
        if row as u64 >= size {
            return Err(AddressError::RowOutOfRange { level, row });
        }
        if column as u64 >= size {
            return Err(AddressError::ColumnOutOfRange { level, column });
        }
        Ok(Self { level, row, column })
    }

    /// The single level-0 tile.
    pub const fn root() -> Self {
        Self {
            level: 0,
            row: 0,
            column: 0,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    /// The tile one level up, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.level == 0 {
            return None;
        }
        Some(Self {
            level: self.level - 1,
            row: self.row / 2,
            column: self.column / 2,
        })
    }

    /// The ancestor at `target_level`.
    ///
    /// Returns `self` when `target_level == level`, and `None` when
    /// `target_level` is deeper than this tile.
    pub fn ancestor(&self, target_level: u32) -> Option<Self> {
        if target_level > self.level {
            return None;
        }
        let shift = self.level - target_level;
        Some(Self {
            level: target_level,
            row: self.row >> shift,
            column: self.column >> shift,
        })
    }

    /// The child tile in the given quadrant.
    ///
    /// Returns `None` at [`MAX_ADDRESS_LEVEL`].
    pub fn child(&self, quadrant: Quadrant) -> Option<Self> {
        if self.level >= MAX_ADDRESS_LEVEL {
            return None;
        }
        Some(Self {
            level: self.level + 1,
            row: self.row * 2 + quadrant.row_offset(),
            column: self.column * 2 + quadrant.column_offset(),
        })
    }

    /// All four children in row-major order.
    pub fn children(&self) -> Option<[Self; 4]> {
        let tl = self.child(Quadrant::TopLeft)?;
        Some(Quadrant::ALL.map(|q| Self {
            level: tl.level,
            row: tl.row + q.row_offset(),
            column: tl.column + q.column_offset(),
        }))
    }

    /// This tile and its three siblings (the parent's children).
    pub fn siblings(&self) -> Option<[Self; 4]> {
        self.parent()?.children()
    }

    /// Where this tile sits inside its parent. `None` for the root.
    pub fn quadrant(&self) -> Option<Quadrant> {
        if self.level == 0 {
            return None;
        }
        Some(Quadrant::from_offsets(self.row % 2, self.column % 2))
    }

    /// Level of the elevation grid that serves this tile.
    ///
    /// See [`ancestor_elevation_level`].
    pub fn elevation_level(&self, base_level: u32) -> i32 {
        ancestor_elevation_level(self.level, base_level)
    }

    /// Address of the elevation tile that serves this tile.
    ///
    /// `None` at or above `base_level`: such tiles never carry elevation.
    pub fn elevation_ancestor(&self, base_level: u32) -> Option<Self> {
        if self.level <= base_level {
            return None;
        }
        let level = self.elevation_level(base_level);
        self.ancestor(u32::try_from(level).ok()?)
    }

    /// Canonical cache key `"{level}_{row}_{column}"`.
    pub fn cache_key(&self) -> String {
        self.to_string()
    }

    /// Envelope of this tile in the Mercator plane.
    pub fn mercator_envelope(&self) -> MercatorEnvelope {
        MercatorEnvelope::for_tile(self.level, self.row, self.column)
    }

    /// Envelope of this tile in geographic degrees.
    pub fn geographic_envelope(&self) -> GeoEnvelope {
        self.mercator_envelope().to_geographic()
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.level, self.row, self.column)
    }
}

/// Level of the elevation pyramid that serves image level `level`.
///
/// Elevation grids are fetched every third level starting at `base_level`:
/// `base + 3 * floor((level - 1 - base) / 3)`. Image levels `base+1..=base+3`
/// map to `base`, `base+4..=base+6` to `base + 3`, and so on. The result is
/// negative-capable because levels at or above the base still produce a value
/// (below `base`) even though they never carry elevation.
pub fn ancestor_elevation_level(level: u32, base_level: u32) -> i32 {
    let offset = level as i64 - 1 - base_level as i64;
    (base_level as i64 + 3 * offset.div_euclid(3)) as i32
}
