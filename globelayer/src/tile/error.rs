//! Tile error types.

use thiserror::Error;

/// Errors raised when constructing a [`TileAddress`](super::TileAddress).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Row index is not below `2^level`.
    #[error("row {row} is outside the grid at level {level}")]
    RowOutOfRange { level: u32, row: u32 },

    /// Column index is not below `2^level`.
    #[error("column {column} is outside the grid at level {level}")]
    ColumnOutOfRange { level: u32, column: u32 },

    /// Level exceeds the deepest supported pyramid level.
    #[error("level {level} exceeds maximum level {max}")]
    LevelTooDeep { level: u32, max: u32 },
}
