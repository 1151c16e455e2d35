//! Tile mesh generation.
//!
//! Both flat and terrain tiles are regular grids cut from the tile's Mercator
//! envelope. Each grid sample is unprojected to geographic degrees, optionally
//! lifted by an elevation sample, and placed on the sphere.
//!
//! ```text
//!  (0,0) ─────────── (0,s)      uv (0,0) top-left
//!    │  ╲              │
//!    │    ╲  2 tris    │
//!    │      ╲  / cell  │
//!  (s,0) ─────────── (s,s)      uv (1,1) bottom-right
//! ```

use crate::coord::{geographic_to_cartesian, mercator_to_geographic};
use crate::tile::TileAddress;

/// Vertex, index and texture coordinate arrays for one tile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileMesh {
    /// Flattened `xyz` positions, `(segment + 1)^2 * 3` values.
    pub positions: Vec<f32>,
    /// Triangle list, `6 * segment^2` entries.
    pub indices: Vec<u32>,
    /// Flattened `uv` coordinates, `(segment + 1)^2 * 2` values.
    pub uvs: Vec<f32>,
    /// Grid subdivisions per axis.
    pub segment: u32,
}

impl TileMesh {
    /// Builds the mesh for `address` with `segment` subdivisions per axis.
    ///
    /// When `heights` is given it must hold `(segment + 1)^2` samples in
    /// row-major order starting at the tile's top-left corner; each sample is
    /// added to `radius` for its vertex.
    ///
    /// # Panics
    ///
    /// Panics if `segment` is zero or `heights` has the wrong length.
    pub fn build(address: TileAddress, segment: u32, heights: Option<&[f64]>, radius: f64) -> Self {
        assert!(segment > 0, "segment must be positive");
        let side = segment as usize + 1;
        if let Some(heights) = heights {
            assert_eq!(
                heights.len(),
                side * side,
                "height grid does not match segment {}",
                segment
            );
        }

        let env = address.mercator_envelope();
        let dx = env.width() / segment as f64;
        let dy = env.height() / segment as f64;
        let step = 1.0 / segment as f64;

        let mut positions = Vec::with_capacity(side * side * 3);
        let mut uvs = Vec::with_capacity(side * side * 2);

        for i in 0..side {
            let y = env.max_y - i as f64 * dy;
            for j in 0..side {
                let x = env.min_x + j as f64 * dx;
                let (lon, lat) = mercator_to_geographic(x, y);
                let height = heights.map_or(0.0, |h| h[side * i + j]);
                let [px, py, pz] = geographic_to_cartesian(lon, lat, radius + height);
                positions.extend_from_slice(&[px as f32, py as f32, pz as f32]);
                uvs.extend_from_slice(&[(j as f64 * step) as f32, (i as f64 * step) as f32]);
            }
        }

        let s = segment as usize;
        let mut indices = Vec::with_capacity(6 * s * s);
        for i in 0..s {
            for j in 0..s {
                let idx0 = (side * i + j) as u32;
                let idx1 = (side * (i + 1) + j) as u32;
                let idx2 = idx1 + 1;
                let idx3 = idx0 + 1;
                indices.extend_from_slice(&[idx0, idx1, idx2, idx2, idx3, idx0]);
            }
        }

        Self {
            positions,
            indices,
            uvs,
            segment,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Position of vertex `index` as `[x, y, z]`.
    pub fn position(&self, index: usize) -> [f32; 3] {
        let p = &self.positions[index * 3..index * 3 + 3];
        [p[0], p[1], p[2]]
    }

    /// Texture coordinate of vertex `index` as `[u, v]`.
    pub fn uv(&self, index: usize) -> [f32; 2] {
        [self.uvs[index * 2], self.uvs[index * 2 + 1]]
    }
}
