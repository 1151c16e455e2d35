//! Renderable tile patches.
//!
//! A [`Tile`] starts `Unknown` and settles as either a flat patch on the
//! sphere or a terrain patch lifted by elevation samples:
//!
//! ```text
//!             not candidate                candidate + elevation
//!  Unknown ─────────────────► Flat ───────────────────────────► Terrain
//!     │                        ▲ │                                 │
//!     │ candidate, no data     │ │ candidate, no data              │ source level
//!     ▼                        │ ▼                                 ▼ changed: rebuild
//!  (hidden) ─── not candidate ─┘ (hidden)
//! ```
//!
//! A candidate tile without elevation is hidden, not drawn flat.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::camera::{Camera, TOP_DOWN_PITCH};
use crate::config::{GlobeConfig, MAX_FLAT_BASE_LEVEL};
use crate::elevation::grid::TILE_SEGMENT;
use crate::elevation::{ElevationCache, ElevationGrid};
use crate::render::{BufferHandle, DrawCall, Drawable, MeshAllocator, MeshBuffers, RenderTarget};
use crate::telemetry::GlobeMetrics;
use crate::texture::TextureHandle;
use crate::tile::{TileAddress, TileMesh};

/// How a tile is currently rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    /// No geometry built yet.
    Unknown,
    /// Flat patch on the sphere.
    Flat,
    /// Patch displaced by an 11×11 elevation grid.
    Terrain,
}

/// Everything a terrain check reads besides the tile itself.
pub struct TerrainContext<'a> {
    pub config: &'a GlobeConfig,
    /// Current camera pitch in degrees.
    pub pitch: f64,
    pub elevation: &'a ElevationCache,
    pub allocator: &'a Arc<dyn MeshAllocator>,
    pub metrics: &'a GlobeMetrics,
}

/// One renderable patch of the pyramid.
#[derive(Debug)]
pub struct Tile {
    address: TileAddress,
    kind: TileKind,
    visible: bool,
    segment: u32,
    elevation: Option<ElevationGrid>,
    mesh: Option<TileMesh>,
    buffers: Option<MeshBuffers>,
    texture: TextureHandle,
    layer_level: u32,
}

impl Tile {
    /// Creates an `Unknown` tile owned by the layer at `layer_level`.
    pub fn new(address: TileAddress, texture: TextureHandle, layer_level: u32) -> Self {
        Self {
            address,
            kind: TileKind::Unknown,
            visible: true,
            segment: 0,
            elevation: None,
            mesh: None,
            buffers: None,
            texture,
            layer_level,
        }
    }

    pub fn address(&self) -> TileAddress {
        self.address
    }

    pub fn kind(&self) -> TileKind {
        self.kind
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Grid subdivisions of the current mesh; 0 before the first build.
    pub fn segment(&self) -> u32 {
        self.segment
    }

    pub fn mesh(&self) -> Option<&TileMesh> {
        self.mesh.as_ref()
    }

    pub fn elevation(&self) -> Option<&ElevationGrid> {
        self.elevation.as_ref()
    }

    pub fn texture(&self) -> &TextureHandle {
        &self.texture
    }

    pub fn buffer_handle(&self) -> Option<BufferHandle> {
        self.buffers.as_ref().map(MeshBuffers::handle)
    }

    /// Level of the layer that owns this tile.
    pub fn layer_level(&self) -> u32 {
        self.layer_level
    }

    /// Whether the tile should render as terrain under `ctx`.
    ///
    /// `force` skips the level, terrain-enabled and pitch conditions.
    pub fn is_terrain_candidate(&self, ctx: &TerrainContext<'_>, force: bool) -> bool {
        force
            || (self.address.level() >= ctx.config.terrain_level
                && ctx.config.terrain_enabled
                && ctx.pitch != TOP_DOWN_PITCH)
    }

    /// Re-evaluates flat versus terrain and rebuilds geometry when needed.
    pub fn check_terrain(&mut self, ctx: &TerrainContext<'_>, force: bool) {
        if self.is_terrain_candidate(ctx, force) {
            match ctx.elevation.elevation_for(self.address) {
                Some(grid) => {
                    let same_source = self.kind == TileKind::Terrain
                        && self.elevation.as_ref().map(ElevationGrid::source_level)
                            == Some(grid.source_level());
                    if !same_source {
                        self.build_terrain(grid, ctx);
                    }
                }
                None if self.kind != TileKind::Terrain => {
                    if self.visible {
                        self.visible = false;
                        ctx.metrics.tile_awaiting_elevation();
                        debug!(tile = %self.address, "Hiding tile until elevation resolves");
                    }
                }
                None => {}
            }
            return;
        }

        match self.kind {
            TileKind::Unknown => self.build_flat(ctx),
            TileKind::Flat if !self.visible && self.buffers.is_some() => self.visible = true,
            TileKind::Flat | TileKind::Terrain => {}
        }
    }

    /// Subdivisions for a flat tile: `2^(base - level)` above the base level, else 1.
    ///
    /// The base is capped at [`MAX_FLAT_BASE_LEVEL`].
    pub fn flat_segment(level: u32, flat_base_level: u32) -> u32 {
        let base = flat_base_level.min(MAX_FLAT_BASE_LEVEL);
        if level < base {
            1 << (base - level)
        } else {
            1
        }
    }

    fn build_flat(&mut self, ctx: &TerrainContext<'_>) {
        let segment = Self::flat_segment(self.address.level(), ctx.config.flat_base_level);
        self.elevation = None;
        if self.rebuild(TileKind::Flat, segment, ctx) {
            ctx.metrics.flat_built();
        }
    }

    fn build_terrain(&mut self, grid: ElevationGrid, ctx: &TerrainContext<'_>) {
        debug!(
            tile = %self.address,
            source_level = grid.source_level(),
            "Building terrain"
        );
        self.elevation = Some(grid);
        if self.rebuild(TileKind::Terrain, TILE_SEGMENT as u32, ctx) {
            ctx.metrics.terrain_built();
        }
    }

    /// Regenerates the mesh and replaces the GPU buffers.
    ///
    /// The previous buffers are released before the new upload. A failed
    /// upload hides the tile and resets it to `Unknown` so the next check
    /// builds again.
    fn rebuild(&mut self, kind: TileKind, segment: u32, ctx: &TerrainContext<'_>) -> bool {
        self.buffers = None;
        let heights = self.elevation.as_ref().map(ElevationGrid::values);
        let mesh = TileMesh::build(self.address, segment, heights, ctx.config.earth_radius);

        match MeshBuffers::upload(ctx.allocator, &mesh) {
            Ok(buffers) => {
                self.buffers = Some(buffers);
                self.visible = true;
                self.kind = kind;
                self.segment = segment;
                self.mesh = Some(mesh);
                true
            }
            Err(e) => {
                ctx.metrics.gpu_allocation_failed();
                warn!(tile = %self.address, layer = self.layer_level, error = %e, "GPU allocation failed, hiding tile");
                self.visible = false;
                self.kind = TileKind::Unknown;
                self.mesh = None;
                false
            }
        }
    }
}

impl Drawable for Tile {
    fn draw(&self, _camera: &dyn Camera, target: &mut dyn RenderTarget) {
        if !self.visible {
            return;
        }
        if let Some(buffers) = &self.buffers {
            target.submit(DrawCall {
                address: self.address,
                buffer: buffers.handle(),
                index_count: buffers.index_count(),
                texture: self.texture.clone(),
            });
        }
    }
}
