//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (longitude/latitude in
//! degrees), the spherical Web Mercator plane the tile pyramid is cut from,
//! and Cartesian positions on the globe used for mesh vertices.
//!
//! # Conventions
//!
//! - Longitude comes first in every `(lon, lat)` pair
//! - The Mercator plane spans `[-MAX_PROJECTED_COORD, MAX_PROJECTED_COORD]` on both axes
//! - Cartesian space is Y-up: the north pole sits at `(0, r, 0)`, and the
//!   point `(lon = 0, lat = 0)` at `(0, 0, r)`

mod envelope;

pub use envelope::{GeoEnvelope, MercatorEnvelope};

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Sphere radius used by the Web Mercator projection, in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the width of the projected plane (`π · EARTH_RADIUS`).
pub const MAX_PROJECTED_COORD: f64 = PI * EARTH_RADIUS;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -MAX_LAT;

/// Converts a projected Mercator position to geographic degrees.
///
/// Returns `(lon, lat)`.
#[inline]
pub fn mercator_to_geographic(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees();
    (lon, lat)
}

/// Converts geographic degrees to a projected Mercator position.
///
/// Latitudes beyond the Mercator limit are clamped so the result stays finite.
#[inline]
pub fn geographic_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(MIN_LAT, MAX_LAT);
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Converts geographic degrees at a given radius to a Cartesian position.
#[inline]
pub fn geographic_to_cartesian(lon: f64, lat: f64, radius: f64) -> [f64; 3] {
    let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    [
        radius * sin_lon * cos_lat,
        radius * sin_lat,
        radius * cos_lon * cos_lat,
    ]
}

/// Converts a Cartesian position back to geographic degrees.
///
/// Returns `(lon, lat)`. The radius of the input position is ignored.
pub fn cartesian_to_geographic(position: [f64; 3]) -> (f64, f64) {
    let [x, y, z] = position;
    let horizontal = (x * x + z * z).sqrt();
    let lat = y.atan2(horizontal).to_degrees();
    let lon = x.atan2(z).to_degrees();
    (lon, lat)
}

/// Number of tiles along one axis of the pyramid at `level`.
#[inline]
pub fn tiles_per_axis(level: u32) -> u64 {
    1u64 << level
}

/// Returns the `(row, column)` of the tile containing a geographic position.
///
/// Coordinates outside the Mercator square are clamped onto its border.
pub fn geographic_to_tile(lon: f64, lat: f64, level: u32) -> (u32, u32) {
    let (x, y) = geographic_to_mercator(lon, lat);
    let n = tiles_per_axis(level) as f64;
    let size = 2.0 * MAX_PROJECTED_COORD / n;
    let max_index = n - 1.0;
    let column = ((x + MAX_PROJECTED_COORD) / size).floor().clamp(0.0, max_index);
    let row = ((MAX_PROJECTED_COORD - y) / size).floor().clamp(0.0, max_index);
    (row as u32, column as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_maps_to_mercator_origin() {
        let (x, y) = geographic_to_mercator(0.0, 0.0);
        assert!(x.abs() < 1e-9);
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn test_mercator_extent_matches_max_latitude() {
        let (lon, lat) = mercator_to_geographic(MAX_PROJECTED_COORD, MAX_PROJECTED_COORD);
        assert!((lon - 180.0).abs() < 1e-9);
        assert!((lat - MAX_LAT).abs() < 1e-6, "lat was {}", lat);
    }

    #[test]
    fn test_cartesian_axes() {
        let p = geographic_to_cartesian(0.0, 0.0, EARTH_RADIUS);
        assert!(p[0].abs() < 1e-6);
        assert!(p[1].abs() < 1e-6);
        assert!((p[2] - EARTH_RADIUS).abs() < 1e-6);

        let north = geographic_to_cartesian(0.0, 90.0, 1.0);
        assert!((north[1] - 1.0).abs() < 1e-12);

        let east = geographic_to_cartesian(90.0, 0.0, 1.0);
        assert!((east[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cartesian_roundtrip_new_york() {
        let p = geographic_to_cartesian(-74.0060, 40.7128, EARTH_RADIUS + 120.0);
        let (lon, lat) = cartesian_to_geographic(p);
        assert!((lon - (-74.0060)).abs() < 1e-9);
        assert!((lat - 40.7128).abs() < 1e-9);
    }

    #[test]
    fn test_geographic_to_tile_quadrants_at_level_one() {
        assert_eq!(geographic_to_tile(-90.0, 45.0, 1), (0, 0));
        assert_eq!(geographic_to_tile(90.0, 45.0, 1), (0, 1));
        assert_eq!(geographic_to_tile(-90.0, -45.0, 1), (1, 0));
        assert_eq!(geographic_to_tile(90.0, -45.0, 1), (1, 1));
    }

    #[test]
    fn test_geographic_to_tile_clamps_edges() {
        let (row, col) = geographic_to_tile(180.0, 89.0, 3);
        assert_eq!(row, 0);
        assert_eq!(col, 7);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_mercator_roundtrip(
                lon in -180.0..180.0_f64,
                lat in -85.0..85.0_f64,
            ) {
                let (x, y) = geographic_to_mercator(lon, lat);
                let (lon2, lat2) = mercator_to_geographic(x, y);
                prop_assert!((lon - lon2).abs() < 1e-9);
                prop_assert!((lat - lat2).abs() < 1e-9);
            }

            #[test]
            fn test_cartesian_keeps_radius(
                lon in -180.0..180.0_f64,
                lat in -90.0..90.0_f64,
                radius in 1.0..1.0e7_f64,
            ) {
                let [x, y, z] = geographic_to_cartesian(lon, lat, radius);
                let length = (x * x + y * y + z * z).sqrt();
                prop_assert!((length - radius).abs() / radius < 1e-12);
            }

            #[test]
            fn test_tile_indices_in_bounds(
                lon in -180.0..180.0_f64,
                lat in -85.0..85.0_f64,
                level in 0u32..=20,
            ) {
                let (row, col) = geographic_to_tile(lon, lat, level);
                let n = tiles_per_axis(level);
                prop_assert!((row as u64) < n);
                prop_assert!((col as u64) < n);
            }
        }
    }
}
