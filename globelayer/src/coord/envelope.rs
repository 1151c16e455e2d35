//! Tile envelopes in projected and geographic space.

use super::{mercator_to_geographic, tiles_per_axis, MAX_PROJECTED_COORD};

/// Axis-aligned rectangle in the Web Mercator plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorEnvelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl MercatorEnvelope {
    /// Envelope covered by the tile at `(level, row, column)`.
    ///
    /// Rows grow southward, so row 0 touches `+MAX_PROJECTED_COORD`.
    pub fn for_tile(level: u32, row: u32, column: u32) -> Self {
        let size = 2.0 * MAX_PROJECTED_COORD / tiles_per_axis(level) as f64;
        let min_x = -MAX_PROJECTED_COORD + column as f64 * size;
        let max_y = MAX_PROJECTED_COORD - row as f64 * size;
        Self {
            min_x,
            min_y: max_y - size,
            max_x: min_x + size,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Grows the envelope by `dx` on the left/right and `dy` on the top/bottom.
    pub fn padded(&self, dx: f64, dy: f64) -> Self {
        Self {
            min_x: self.min_x - dx,
            min_y: self.min_y - dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }

    /// Converts the corners to geographic degrees.
    pub fn to_geographic(&self) -> GeoEnvelope {
        let (min_lon, min_lat) = mercator_to_geographic(self.min_x, self.min_y);
        let (max_lon, max_lat) = mercator_to_geographic(self.max_x, self.max_y);
        GeoEnvelope {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoEnvelope {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoEnvelope {
    /// Center of the box as `(lon, lat)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::MAX_LAT;

    #[test]
    fn test_root_tile_covers_whole_plane() {
        let env = MercatorEnvelope::for_tile(0, 0, 0);
        assert_eq!(env.min_x, -MAX_PROJECTED_COORD);
        assert_eq!(env.max_x, MAX_PROJECTED_COORD);
        assert_eq!(env.min_y, -MAX_PROJECTED_COORD);
        assert_eq!(env.max_y, MAX_PROJECTED_COORD);
    }

    #[test]
    fn test_level_one_bottom_right() {
        let env = MercatorEnvelope::for_tile(1, 1, 1);
        assert_eq!(env.min_x, 0.0);
        assert_eq!(env.max_y, 0.0);
        assert_eq!(env.max_x, MAX_PROJECTED_COORD);
        assert_eq!(env.min_y, -MAX_PROJECTED_COORD);
    }

    #[test]
    fn test_children_tile_the_parent() {
        let parent = MercatorEnvelope::for_tile(3, 2, 5);
        let tl = MercatorEnvelope::for_tile(4, 4, 10);
        let br = MercatorEnvelope::for_tile(4, 5, 11);
        assert!((tl.min_x - parent.min_x).abs() < 1e-6);
        assert!((tl.max_y - parent.max_y).abs() < 1e-6);
        assert!((br.max_x - parent.max_x).abs() < 1e-6);
        assert!((br.min_y - parent.min_y).abs() < 1e-6);
    }

    #[test]
    fn test_padding_grows_each_side() {
        let env = MercatorEnvelope::for_tile(2, 1, 1).padded(10.0, 5.0);
        let base = MercatorEnvelope::for_tile(2, 1, 1);
        assert!((env.width() - base.width() - 20.0).abs() < 1e-6);
        assert!((env.height() - base.height() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_geographic_envelope_of_root() {
        let geo = MercatorEnvelope::for_tile(0, 0, 0).to_geographic();
        assert!((geo.min_lon + 180.0).abs() < 1e-9);
        assert!((geo.max_lon - 180.0).abs() < 1e-9);
        assert!((geo.max_lat - MAX_LAT).abs() < 1e-6);
        assert!(geo.contains(0.0, 0.0));
        let (lon, lat) = geo.center();
        assert!(lon.abs() < 1e-9 && lat.abs() < 1e-9);
    }
}
