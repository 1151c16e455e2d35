//! The globe orchestrator.
//!
//! A [`Globe`] owns one [`SubLayer`] per pyramid level and keeps their tile
//! sets in step with the camera. Each [`refresh`](Globe::refresh):
//!
//! ```text
//! camera.visible(current + look_ahead)
//!        │
//!        ▼
//!  parent projection ──► visible set per level (2..=deepest)
//!        │
//!        ▼
//!  SubLayer::update_tiles (shallow → deep)
//!        │
//!        ▼
//!  request_elevations + check_terrain (terrain enabled only)
//! ```
//!
//! Levels 0 and 1 are always resident and are only rebuilt when the image
//! source changes. The [`GlobeDriver`] runs refreshes on a timer inside a
//! tokio task.

mod driver;

pub use driver::{
    DriverClosed, GlobeCommand, GlobeDriver, GlobeHandle, DEFAULT_COMMAND_CHANNEL_CAPACITY,
};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::camera::{Camera, VisibilityOptions};
use crate::config::{ConfigError, GlobeConfig};
use crate::elevation::{ElevationCache, ElevationFetcher};
use crate::layer::{destroy_layer, SubLayer, TileSources};
use crate::provider::ImageSource;
use crate::render::{Drawable, MeshAllocator, RenderTarget};
use crate::telemetry::{GlobeMetrics, TelemetrySnapshot};
use crate::texture::TextureLoader;
use crate::tile::{TerrainContext, TileAddress};

/// Shallowest level reconciled by [`Globe::refresh`]. Shallower levels are
/// built eagerly.
pub const FIRST_RECONCILED_LEVEL: u32 = 2;

// =============================================================================
// Services
// =============================================================================

/// Shared collaborators a globe draws on.
#[derive(Clone)]
pub struct GlobeServices {
    pub elevation: ElevationCache,
    pub textures: Arc<dyn TextureLoader>,
    pub allocator: Arc<dyn MeshAllocator>,
    pub metrics: Arc<GlobeMetrics>,
}

impl GlobeServices {
    /// Builds services with a fresh elevation cache and metrics.
    pub fn new(
        config: &GlobeConfig,
        fetcher: Arc<dyn ElevationFetcher>,
        textures: Arc<dyn TextureLoader>,
        allocator: Arc<dyn MeshAllocator>,
    ) -> Self {
        let metrics = Arc::new(GlobeMetrics::new());
        let elevation = ElevationCache::new(
            fetcher,
            config.elevation_base_level,
            config.elevation_exaggeration,
            Arc::clone(&metrics),
        );
        Self {
            elevation,
            textures,
            allocator,
            metrics,
        }
    }
}

// =============================================================================
// Globe
// =============================================================================

/// Tiled level-of-detail globe.
pub struct Globe<C: Camera> {
    config: GlobeConfig,
    camera: C,
    current_level: u32,
    layers: BTreeMap<u32, SubLayer>,
    image_source: Arc<dyn ImageSource>,
    services: GlobeServices,
}

impl<C: Camera> Globe<C> {
    /// Creates a globe at level 0 with layers 0 and 1 populated.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found by [`GlobeConfig::validate`].
    pub fn new(
        config: GlobeConfig,
        mut camera: C,
        image_source: Arc<dyn ImageSource>,
        services: GlobeServices,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        camera.set_level(0);
        let mut globe = Self {
            config,
            camera,
            current_level: 0,
            layers: BTreeMap::new(),
            image_source,
            services,
        };
        globe.build_base_layers();
        Ok(globe)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &GlobeConfig {
        &self.config
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    /// Mutable camera access. Changes take effect on the next refresh.
    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    pub fn current_level(&self) -> u32 {
        self.current_level
    }

    /// Deepest level the current level makes resident.
    pub fn deepest_level(&self) -> u32 {
        self.current_level + self.config.look_ahead
    }

    pub fn image_source(&self) -> &Arc<dyn ImageSource> {
        &self.image_source
    }

    pub fn layer(&self, level: u32) -> Option<&SubLayer> {
        self.layers.get(&level)
    }

    /// Layers in ascending level order.
    pub fn layers(&self) -> impl Iterator<Item = &SubLayer> {
        self.layers.values()
    }

    pub fn elevation(&self) -> &ElevationCache {
        &self.services.elevation
    }

    pub fn metrics(&self) -> &Arc<GlobeMetrics> {
        &self.services.metrics
    }

    /// Counter snapshot.
    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.services.metrics.snapshot()
    }

    /// Resident tiles across all layers.
    pub fn tile_count(&self) -> usize {
        self.layers.values().map(SubLayer::len).sum()
    }

    /// Whether every resident texture has settled.
    pub fn all_loaded(&self) -> bool {
        self.layers.values().all(SubLayer::all_loaded)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Replaces the imagery source.
    ///
    /// Every tile is destroyed and the texture cache cleared. Layers 0 and 1
    /// are rebuilt immediately and a refresh follows.
    pub fn set_image_source(&mut self, source: Arc<dyn ImageSource>) {
        info!(source = source.name(), "Changing image source");
        self.destroy();
        self.services.textures.clear();
        self.image_source = source;
        self.build_base_layers();
        self.refresh();
    }

    /// Moves to `level`, clamped to `0..=max_level`.
    ///
    /// Returns whether the level changed. A change is passed to the camera
    /// and followed by a refresh.
    pub fn set_level(&mut self, level: u32) -> bool {
        let level = level.min(self.config.max_level);
        if level == self.current_level {
            return false;
        }
        debug!(from = self.current_level, to = level, "Changing level");
        self.current_level = level;
        self.camera.set_level(level);
        self.refresh();
        true
    }

    /// Reconciles every layer with the camera and advances terrain.
    pub fn refresh(&mut self) {
        let deepest = self.deepest_level();
        self.ensure_layers(deepest.max(1));

        let Self {
            config,
            camera,
            layers,
            image_source,
            services,
            ..
        } = self;

        let pitch = camera.pitch_degrees();
        let options = VisibilityOptions::for_pitch(pitch);
        let visible = camera.visible_tile_addresses(deepest, &options);
        let per_level = project_visible_sets(visible, deepest, FIRST_RECONCILED_LEVEL);

        let ctx = terrain_context(config, pitch, services);
        let sources = TileSources {
            image_source: image_source.as_ref(),
            textures: services.textures.as_ref(),
        };

        for (level, set) in &per_level {
            if let Some(layer) = layers.get_mut(level) {
                layer.update_tiles(set, true, &sources, &ctx);
            }
        }

        if config.terrain_enabled {
            let mut requested = 0;
            for level in (config.elevation_base_level + 1)..=deepest {
                let Some(layer) = layers.get_mut(&level) else {
                    continue;
                };
                requested += layer.request_elevations(&services.elevation);
                if level >= config.terrain_level {
                    layer.check_terrain(&ctx, false);
                }
            }
            if requested > 0 {
                debug!(requested, "Requested elevation tiles");
            }
        }

        services.metrics.refresh_completed();
        debug!(
            level = self.current_level,
            deepest,
            tiles = self.tile_count(),
            "Refresh complete"
        );
    }

    /// Runs the terrain check on every resident tile.
    pub fn check_terrain(&mut self, force: bool) {
        let pitch = self.camera.pitch_degrees();
        let ctx = terrain_context(&self.config, pitch, &self.services);
        for layer in self.layers.values_mut() {
            layer.check_terrain(&ctx, force);
        }
    }

    /// Makes layers `0..=deepest` exist and drops deeper ones.
    pub fn ensure_layers(&mut self, deepest: u32) {
        for level in 0..=deepest {
            if !self.layers.contains_key(&level) {
                self.layers.insert(level, SubLayer::new(level, &self.config));
            }
        }
        let stale = self.layers.split_off(&(deepest + 1));
        for (_, mut layer) in stale {
            destroy_layer(&mut layer, &self.services.metrics);
        }
    }

    /// Destroys every layer and tile.
    pub fn destroy(&mut self) {
        for layer in self.layers.values_mut() {
            destroy_layer(layer, &self.services.metrics);
        }
        self.layers.clear();
    }

    /// Draws all layers through `target` with the globe's own camera.
    pub fn render(&self, target: &mut dyn RenderTarget) {
        self.draw(&self.camera, target);
    }

    fn build_base_layers(&mut self) {
        self.ensure_layers(1);
        let root = TileAddress::root();
        let ctx = terrain_context(&self.config, self.camera.pitch_degrees(), &self.services);
        let sources = TileSources {
            image_source: self.image_source.as_ref(),
            textures: self.services.textures.as_ref(),
        };
        if let Some(layer) = self.layers.get_mut(&0) {
            layer.add_tile(root, &sources, &ctx);
        }
        if let (Some(layer), Some(children)) = (self.layers.get_mut(&1), root.children()) {
            for child in children {
                layer.add_tile(child, &sources, &ctx);
            }
        }
    }
}

impl<C: Camera> Drawable for Globe<C> {
    fn draw(&self, camera: &dyn Camera, target: &mut dyn RenderTarget) {
        for layer in self.layers.values() {
            layer.draw(camera, target);
        }
    }
}

impl<C: Camera> Drop for Globe<C> {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn terrain_context<'a>(
    config: &'a GlobeConfig,
    pitch: f64,
    services: &'a GlobeServices,
) -> TerrainContext<'a> {
    TerrainContext {
        config,
        pitch,
        elevation: &services.elevation,
        allocator: &services.allocator,
        metrics: &services.metrics,
    }
}

/// Projects the visible set at `deepest` onto every level down to
/// `shallowest` by repeated parent mapping.
///
/// Addresses not at `deepest` are ignored. Returns an empty map when
/// `deepest < shallowest`.
pub fn project_visible_sets(
    visible: BTreeSet<TileAddress>,
    deepest: u32,
    shallowest: u32,
) -> BTreeMap<u32, BTreeSet<TileAddress>> {
    let mut sets = BTreeMap::new();
    if deepest < shallowest {
        return sets;
    }
    let mut current: BTreeSet<TileAddress> = visible
        .into_iter()
        .filter(|address| address.level() == deepest)
        .collect();
    for level in (shallowest..deepest).rev() {
        let parents = current.iter().filter_map(TileAddress::parent).collect();
        sets.insert(level + 1, std::mem::replace(&mut current, parents));
    }
    sets.insert(shallowest, current);
    sets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::FootprintCamera;
    use crate::elevation::grid::FETCH_SAMPLE_COUNT;
    use crate::elevation::{BoxFuture, ElevationError};
    use crate::provider::XyzImageSource;
    use crate::render::{RecordingAllocator, RecordingTarget, RenderEvent};
    use crate::texture::PlaceholderTextureLoader;
    use crate::tile::TileKind;

    struct OfflineFetcher;

    impl ElevationFetcher for OfflineFetcher {
        fn fetch(&self, _address: TileAddress) -> BoxFuture<'static, Result<Vec<f64>, ElevationError>> {
            Box::pin(async { Err(ElevationError::Http("offline".to_string())) })
        }
    }

    fn globe_with(config: GlobeConfig, camera: FootprintCamera) -> (Globe<FootprintCamera>, Arc<RecordingAllocator>) {
        let recorder = Arc::new(RecordingAllocator::new());
        let services = GlobeServices::new(
            &config,
            Arc::new(OfflineFetcher),
            Arc::new(PlaceholderTextureLoader),
            recorder.clone(),
        );
        let globe = Globe::new(
            config,
            camera,
            Arc::new(XyzImageSource::arcgis_world_imagery()),
            services,
        )
        .unwrap();
        (globe, recorder)
    }

    fn addr(level: u32, row: u32, column: u32) -> TileAddress {
        TileAddress::new(level, row, column).unwrap()
    }

    #[test]
    fn test_new_builds_base_layers() {
        let (globe, recorder) = globe_with(GlobeConfig::default(), FootprintCamera::new(0.0, 0.0));
        assert_eq!(globe.current_level(), 0);
        assert_eq!(globe.layer(0).unwrap().len(), 1);
        assert_eq!(globe.layer(1).unwrap().len(), 4);
        assert!(globe.layer(2).is_none());
        assert_eq!(recorder.live_count(), 5);
        // Level 0 is subdivided 2^6 times per axis.
        assert_eq!(globe.layer(0).unwrap().tiles().next().unwrap().segment(), 64);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = GlobeConfig::default().with_max_level(40);
        let services = GlobeServices::new(
            &config,
            Arc::new(OfflineFetcher),
            Arc::new(PlaceholderTextureLoader),
            Arc::new(RecordingAllocator::new()),
        );
        let result = Globe::new(
            config,
            FootprintCamera::new(0.0, 0.0),
            Arc::new(XyzImageSource::arcgis_world_imagery()),
            services,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_project_visible_sets() {
        let visible: BTreeSet<_> = [addr(4, 0, 0), addr(4, 0, 1), addr(4, 3, 3), addr(4, 15, 15), addr(3, 0, 0)]
            .into_iter()
            .collect();
        let sets = project_visible_sets(visible, 4, 2);

        assert_eq!(sets.keys().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(sets[&4].len(), 4);
        assert_eq!(
            sets[&3],
            [addr(3, 0, 0), addr(3, 1, 1), addr(3, 7, 7)].into_iter().collect()
        );
        assert_eq!(sets[&2], [addr(2, 0, 0), addr(2, 3, 3)].into_iter().collect());
    }

    #[test]
    fn test_project_visible_sets_too_shallow() {
        assert!(project_visible_sets(BTreeSet::new(), 1, 2).is_empty());
    }

    #[test]
    fn test_set_level_clamps_and_refreshes() {
        let config = GlobeConfig::default().with_max_level(5);
        let (mut globe, _) = globe_with(config, FootprintCamera::new(10.0, 45.0));

        assert!(globe.set_level(9));
        assert_eq!(globe.current_level(), 5);
        assert_eq!(globe.camera().level(), 5);
        assert!(!globe.set_level(5));
        assert_eq!(globe.telemetry().refreshes, 1);
        assert_eq!(globe.layers().count(), 9);
    }

    #[test]
    fn test_refresh_populates_levels_through_look_ahead() {
        let (mut globe, _) = globe_with(GlobeConfig::default(), FootprintCamera::new(10.0, 45.0));
        globe.set_level(4);

        let deepest = globe.layer(7).unwrap().addresses();
        assert!(!deepest.is_empty());
        let expected: BTreeSet<_> = deepest.iter().filter_map(|a| a.ancestor(2)).collect();
        assert_eq!(globe.layer(2).unwrap().addresses(), expected);
        for level in 2..=7 {
            assert!(!globe.layer(level).unwrap().is_empty(), "level {level} empty");
        }
        assert!(globe.layer(8).is_none());
    }

    #[test]
    fn test_lowering_level_drops_deep_layers() {
        let (mut globe, recorder) = globe_with(GlobeConfig::default(), FootprintCamera::new(10.0, 45.0));
        globe.set_level(6);
        assert!(globe.layer(9).is_some());
        globe.set_level(2);
        assert!(globe.layer(6).is_none());
        assert_eq!(recorder.live_count(), globe.tile_count());
    }

    #[test]
    fn test_set_image_source_rebuilds() {
        let (mut globe, recorder) = globe_with(GlobeConfig::default(), FootprintCamera::new(10.0, 45.0));
        globe.set_level(5);
        let source = XyzImageSource::new("osm", "https://tile.example.org/{z}/{x}/{y}.png").unwrap();
        globe.set_image_source(Arc::new(source));

        assert_eq!(globe.image_source().name(), "osm");
        assert_eq!(globe.layer(0).unwrap().len(), 1);
        assert_eq!(globe.layer(1).unwrap().len(), 4);
        assert!(globe
            .layers()
            .flat_map(SubLayer::tiles)
            .all(|t| t.texture().url().starts_with("https://tile.example.org/")));
        assert_eq!(recorder.live_count(), globe.tile_count());
    }

    #[test]
    fn test_top_down_requests_but_keeps_flat() {
        let (mut globe, _) = globe_with(GlobeConfig::default(), FootprintCamera::new(10.0, 45.0));
        globe.set_level(8);

        assert!(!globe.elevation().is_empty());
        assert!(globe
            .layer(10)
            .unwrap()
            .tiles()
            .all(|t| t.kind() == TileKind::Flat && t.is_visible()));
    }

    #[test]
    fn test_terrain_disabled_requests_nothing() {
        let config = GlobeConfig::default().with_terrain_enabled(false);
        let (mut globe, _) = globe_with(config, FootprintCamera::new(10.0, 45.0).with_pitch(45.0));
        globe.set_level(8);
        assert!(globe.elevation().is_empty());
        assert_eq!(globe.telemetry().terrain_builds, 0);
    }

    #[test]
    fn test_tilted_terrain_with_seeded_elevation() {
        let camera = FootprintCamera::new(10.0, 45.0).with_pitch(45.0).with_radius(0);
        let (mut globe, _) = globe_with(GlobeConfig::default(), camera);
        globe.set_level(7);

        // Tiles at level 10 wait invisibly for their level-7 grid.
        let tiles: Vec<_> = globe.layer(10).unwrap().tiles().map(|t| t.address()).collect();
        assert!(!tiles.is_empty());
        assert!(globe.layer(10).unwrap().tiles().all(|t| !t.is_visible()));

        for address in &tiles {
            let source = address.elevation_ancestor(7).unwrap();
            globe.elevation().seed(source, vec![100.0; FETCH_SAMPLE_COUNT]).unwrap();
        }
        globe.refresh();
        assert!(globe
            .layer(10)
            .unwrap()
            .tiles()
            .all(|t| t.kind() == TileKind::Terrain && t.is_visible()));
    }

    #[test]
    fn test_check_terrain_force() {
        let (mut globe, _) = globe_with(GlobeConfig::default(), FootprintCamera::new(10.0, 45.0).with_radius(0));
        globe.set_level(5);
        let address = globe.layer(8).unwrap().tiles().next().unwrap().address();
        globe
            .elevation()
            .seed(address.elevation_ancestor(7).unwrap(), vec![1.0; FETCH_SAMPLE_COUNT])
            .unwrap();

        globe.check_terrain(true);
        assert_eq!(globe.layer(8).unwrap().find_tile(address).unwrap().kind(), TileKind::Terrain);
    }

    #[test]
    fn test_render_draws_layers_in_order() {
        let (globe, _) = globe_with(GlobeConfig::default(), FootprintCamera::new(0.0, 0.0));
        let mut target = RecordingTarget::new();
        globe.render(&mut target);

        assert_eq!(target.draw_count(), 5);
        let first_draw = target
            .events()
            .iter()
            .find_map(|e| match e {
                RenderEvent::Draw(call) => Some(call.address),
                _ => None,
            })
            .unwrap();
        assert_eq!(first_draw, TileAddress::root());
    }

    #[test]
    fn test_drop_releases_buffers() {
        let (mut globe, recorder) = globe_with(GlobeConfig::default(), FootprintCamera::new(0.0, 0.0));
        globe.set_level(3);
        assert!(recorder.live_count() > 0);
        drop(globe);
        assert_eq!(recorder.live_count(), 0);
    }
}
