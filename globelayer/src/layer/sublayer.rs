//! Same-level tile collections.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::camera::Camera;
use crate::config::GlobeConfig;
use crate::elevation::ElevationCache;
use crate::provider::ImageSource;
use crate::render::{Drawable, RenderTarget};
use crate::telemetry::GlobeMetrics;
use crate::texture::TextureLoader;
use crate::tile::{ancestor_elevation_level, TerrainContext, Tile, TileAddress};

/// Where new tiles get their textures.
pub struct TileSources<'a> {
    pub image_source: &'a dyn ImageSource,
    pub textures: &'a dyn TextureLoader,
}

/// Tiles added and removed by one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub added: usize,
    pub removed: usize,
}

/// All resident tiles of one pyramid level.
#[derive(Debug)]
pub struct SubLayer {
    level: u32,
    elevation_level: i32,
    elevation_base_level: u32,
    terrain_level: u32,
    terrain_pitch: f64,
    tiles: BTreeMap<TileAddress, Tile>,
}

impl SubLayer {
    /// Creates an empty layer for `level`.
    pub fn new(level: u32, config: &GlobeConfig) -> Self {
        Self {
            level,
            elevation_level: ancestor_elevation_level(level, config.elevation_base_level),
            elevation_base_level: config.elevation_base_level,
            terrain_level: config.terrain_level,
            terrain_pitch: config.terrain_pitch,
            tiles: BTreeMap::new(),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Level of the elevation grids that serve this layer.
    pub fn elevation_level(&self) -> i32 {
        self.elevation_level
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Addresses of all resident tiles, in order.
    pub fn addresses(&self) -> BTreeSet<TileAddress> {
        self.tiles.keys().copied().collect()
    }

    pub fn contains(&self, address: TileAddress) -> bool {
        self.tiles.contains_key(&address)
    }

    pub fn find_tile(&self, address: TileAddress) -> Option<&Tile> {
        self.tiles.get(&address)
    }

    /// Makes the resident set match `visible`.
    ///
    /// Tiles outside `visible` are dropped, which releases their GPU buffers.
    /// With `add_new`, addresses in `visible` that are not resident get a new
    /// tile whose geometry is built right away. Tiles in both sets are not
    /// touched. Addresses of other levels are ignored.
    pub fn update_tiles(
        &mut self,
        visible: &BTreeSet<TileAddress>,
        add_new: bool,
        sources: &TileSources<'_>,
        ctx: &TerrainContext<'_>,
    ) -> ReconcileStats {
        let before = self.tiles.len();
        self.tiles.retain(|address, _| visible.contains(address));
        let removed = before - self.tiles.len();

        let mut added = 0;
        if add_new {
            for &address in visible {
                if address.level() != self.level || self.tiles.contains_key(&address) {
                    continue;
                }
                self.insert_tile(address, sources, ctx);
                added += 1;
            }
        }

        ctx.metrics.tiles_created(added as u64);
        ctx.metrics.tiles_destroyed(removed as u64);
        if added > 0 || removed > 0 {
            debug!(level = self.level, added, removed, resident = self.tiles.len(), "Reconciled layer");
        }
        ReconcileStats { added, removed }
    }

    /// Creates a tile for `address` unless one is resident. Returns whether a
    /// tile was created.
    pub fn add_tile(
        &mut self,
        address: TileAddress,
        sources: &TileSources<'_>,
        ctx: &TerrainContext<'_>,
    ) -> bool {
        if address.level() != self.level || self.tiles.contains_key(&address) {
            return false;
        }
        self.insert_tile(address, sources, ctx);
        ctx.metrics.tiles_created(1);
        true
    }

    fn insert_tile(&mut self, address: TileAddress, sources: &TileSources<'_>, ctx: &TerrainContext<'_>) {
        let url = sources.image_source.image_url(address);
        let texture = sources.textures.load(&url);
        let mut tile = Tile::new(address, texture, self.level);
        tile.check_terrain(ctx, false);
        trace!(tile = %address, kind = ?tile.kind(), "Created tile");
        self.tiles.insert(address, tile);
    }

    /// Requests every distinct elevation grid the resident tiles need.
    ///
    /// Returns the number of new fetches issued.
    pub fn request_elevations(&self, cache: &ElevationCache) -> usize {
        if self.level <= self.elevation_base_level {
            return 0;
        }
        let sources: BTreeSet<TileAddress> = self
            .tiles
            .keys()
            .filter_map(|address| address.elevation_ancestor(self.elevation_base_level))
            .collect();
        sources.into_iter().filter(|&source| cache.request(source)).count()
    }

    /// Runs the terrain check of every resident tile.
    pub fn check_terrain(&mut self, ctx: &TerrainContext<'_>, force: bool) {
        for tile in self.tiles.values_mut() {
            tile.check_terrain(ctx, force);
        }
    }

    /// Whether every resident texture has finished loading or failed.
    pub fn all_loaded(&self) -> bool {
        self.tiles.values().all(|tile| tile.texture().is_settled())
    }

    /// Drops all tiles. Returns how many were destroyed.
    pub fn destroy(&mut self) -> usize {
        let count = self.tiles.len();
        self.tiles.clear();
        count
    }

    /// Whether this layer draws with depth testing at `pitch`.
    pub fn uses_depth_test(&self, pitch: f64) -> bool {
        self.level >= self.terrain_level && pitch <= self.terrain_pitch
    }
}

impl Drawable for SubLayer {
    fn draw(&self, camera: &dyn Camera, target: &mut dyn RenderTarget) {
        if self.uses_depth_test(camera.pitch_degrees()) {
            target.clear_depth();
            target.set_depth_test(true);
        } else {
            target.set_depth_test(false);
        }
        for tile in self.tiles.values() {
            tile.draw(camera, target);
        }
    }
}

/// Records tile destruction for a layer being torn down.
pub(crate) fn destroy_layer(layer: &mut SubLayer, metrics: &GlobeMetrics) {
    let count = layer.destroy();
    metrics.tiles_destroyed(count as u64);
    if count > 0 {
        debug!(level = layer.level(), tiles = count, "Destroyed layer");
    }
}
