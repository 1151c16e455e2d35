//! Headless camera over a square tile footprint.

use std::collections::BTreeSet;

use super::{Camera, VisibilityOptions, TOP_DOWN_PITCH};
use crate::coord::{geographic_to_cartesian, geographic_to_tile, tiles_per_axis, EARTH_RADIUS};
use crate::tile::TileAddress;

/// Camera distance to the surface at level 0, in meters.
const LEVEL_ZERO_DISTANCE: f64 = 7_820_683.0;

/// Most tiles the footprint extends from its center along an axis.
const MAX_FOOTPRINT_RADIUS: u64 = 10;

/// Distance from the surface at which `level` is the natural level of detail.
pub fn camera_distance(level: u32) -> f64 {
    LEVEL_ZERO_DISTANCE / 2f64.powi(level as i32)
}

/// Camera that sees the tiles within a fixed radius of a geographic point.
///
/// Rows are clamped at the poles; columns wrap around the antimeridian.
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintCamera {
    lon: f64,
    lat: f64,
    pitch: f64,
    level: u32,
    radius: u32,
    fov_y: f64,
    aspect: f64,
}

impl FootprintCamera {
    /// Creates a top-down camera above `(lon, lat)` seeing two tiles around the
    /// center tile.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon,
            lat,
            pitch: TOP_DOWN_PITCH,
            level: 0,
            radius: 2,
            fov_y: 45f64.to_radians(),
            aspect: 16.0 / 9.0,
        }
    }

    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.set_pitch(pitch);
        self
    }

    /// Footprint radius in tiles at threshold 1.
    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_aspect(mut self, aspect: f64) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn set_center(&mut self, lon: f64, lat: f64) {
        self.lon = lon;
        self.lat = lat;
    }

    /// Sets the tilt, clamped to `0..=90`.
    pub fn set_pitch(&mut self, pitch: f64) {
        self.pitch = pitch.clamp(0.0, TOP_DOWN_PITCH);
    }

    pub fn center(&self) -> (f64, f64) {
        (self.lon, self.lat)
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    fn eye_and_up(&self) -> ([f64; 3], [f64; 3], [f64; 3]) {
        let target = geographic_to_cartesian(self.lon, self.lat, EARTH_RADIUS);
        let normal = normalize(target);
        let (sin_lon, cos_lon) = self.lon.to_radians().sin_cos();
        let (sin_lat, cos_lat) = self.lat.to_radians().sin_cos();
        let north = [-sin_lat * sin_lon, cos_lat, -sin_lat * cos_lon];

        let (sin_p, cos_p) = self.pitch.to_radians().sin_cos();
        let d = camera_distance(self.level);
        let eye = [0usize, 1, 2].map(|i| target[i] + d * (sin_p * normal[i] - cos_p * north[i]));
        let up = [0usize, 1, 2].map(|i| sin_p * north[i] + cos_p * normal[i]);
        (eye, target, up)
    }
}

impl Camera for FootprintCamera {
    fn visible_tile_addresses(&self, level: u32, options: &VisibilityOptions) -> BTreeSet<TileAddress> {
        let n = tiles_per_axis(level);
        let scaled = (self.radius as f64 * options.threshold.max(0.0)).ceil() as u64;
        let radius = scaled.min(MAX_FOOTPRINT_RADIUS).min(n - 1) as i64;
        let (center_row, center_column) = geographic_to_tile(self.lon, self.lat, level);
        let n = n as i64;

        let mut visible = BTreeSet::new();
        for dr in -radius..=radius {
            let row = center_row as i64 + dr;
            if row < 0 || row >= n {
                continue;
            }
            for dc in -radius..=radius {
                let column = (center_column as i64 + dc).rem_euclid(n);
                if let Ok(address) = TileAddress::new(level, row as u32, column as u32) {
                    visible.insert(address);
                }
            }
        }
        visible
    }

    fn pitch_degrees(&self) -> f64 {
        self.pitch
    }

    fn set_level(&mut self, level: u32) {
        self.level = level;
    }

    fn projection_view_matrix(&self) -> [f64; 16] {
        let (eye, target, up) = self.eye_and_up();
        let d = camera_distance(self.level);
        let projection = perspective(self.fov_y, self.aspect, d * 0.01, d + 2.0 * EARTH_RADIUS);
        multiply(&projection, &look_at(eye, target, up))
    }
}

fn normalize(v: [f64; 3]) -> [f64; 3] {
    let len = dot(v, v).sqrt();
    v.map(|c| c / len)
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn perspective(fov_y: f64, aspect: f64, near: f64, far: f64) -> [f64; 16] {
    let f = 1.0 / (fov_y / 2.0).tan();
    let mut m = [0.0; 16];
    m[0] = f / aspect;
    m[5] = f;
    m[10] = (far + near) / (near - far);
    m[11] = -1.0;
    m[14] = 2.0 * far * near / (near - far);
    m
}

#[rustfmt::skip]
fn look_at(eye: [f64; 3], target: [f64; 3], up: [f64; 3]) -> [f64; 16] {
    let f = normalize([target[0] - eye[0], target[1] - eye[1], target[2] - eye[2]]);
    let s = normalize(cross(f, up));
    let u = cross(s, f);
    [
        s[0], u[0], -f[0], 0.0,
        s[1], u[1], -f[1], 0.0,
        s[2], u[2], -f[2], 0.0,
        -dot(s, eye), -dot(u, eye), dot(f, eye), 1.0,
    ]
}

/// Column-major `a × b`.
fn multiply(a: &[f64; 16], b: &[f64; 16]) -> [f64; 16] {
    let mut out = [0.0; 16];
    for c in 0..4 {
        for r in 0..4 {
            out[c * 4 + r] = (0..4).map(|k| a[k * 4 + r] * b[c * 4 + k]).sum();
        }
    }
    out
}
