//! Shared elevation cache with request deduplication.
//!
//! Entries are keyed by `"{level}_{row}_{column}"` of the elevation-pyramid
//! tile and move `Missing → Pending → Resolved` at most once. A fetch is
//! issued only when the entry is missing, so each address sees at most one
//! network request over the cache's lifetime.
//!
//! Fetch completion happens on a spawned tokio task that writes straight into
//! the shared map. Nothing is pushed to tiles: they pick the data up on the
//! next terrain check.
//!
//! A failed fetch is logged and leaves the entry `Pending`. It is never
//! retried and never cancelled.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::grid::{
    extract_exact, quadrant_path, refine_path, ElevationGrid, FETCH_SAMPLE_COUNT,
};
use super::{ElevationError, ElevationFetcher};
use crate::telemetry::GlobeMetrics;
use crate::tile::TileAddress;

/// State of one elevation-pyramid address.
#[derive(Debug, Clone, PartialEq)]
pub enum ElevationEntry {
    /// Never requested.
    Missing,
    /// Request issued, no data yet.
    Pending,
    /// Fetched 81×81 grid.
    Resolved(Arc<ElevationGrid>),
}

impl ElevationEntry {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ElevationEntry::Resolved(_))
    }
}

/// Elevation store shared by one globe and its fetch tasks.
///
/// Cloning is cheap and yields a handle onto the same entries.
#[derive(Clone)]
pub struct ElevationCache {
    entries: Arc<DashMap<String, ElevationEntry>>,
    fetcher: Arc<dyn ElevationFetcher>,
    in_flight: Arc<AtomicUsize>,
    base_level: u32,
    exaggeration: f64,
    metrics: Arc<GlobeMetrics>,
}

impl ElevationCache {
    /// Creates an empty cache.
    ///
    /// `base_level` is the first level of the elevation pyramid and
    /// `exaggeration` multiplies every resolved sample.
    pub fn new(
        fetcher: Arc<dyn ElevationFetcher>,
        base_level: u32,
        exaggeration: f64,
        metrics: Arc<GlobeMetrics>,
    ) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            fetcher,
            in_flight: Arc::new(AtomicUsize::new(0)),
            base_level,
            exaggeration,
            metrics,
        }
    }

    pub fn base_level(&self) -> u32 {
        self.base_level
    }

    /// Requests the elevation tile that serves `address`.
    ///
    /// Tiles at or above the base level never carry elevation; for them this
    /// is a no-op. Returns `true` if a new request was issued.
    pub fn request_for_tile(&self, address: TileAddress) -> bool {
        match address.elevation_ancestor(self.base_level) {
            Some(source) => self.request(source),
            None => false,
        }
    }

    /// Requests the elevation grid of `source` itself.
    ///
    /// Only a missing entry triggers a fetch; pending and resolved entries are
    /// left alone. Returns `true` if a new request was issued.
    ///
    /// The fetch runs on the current tokio runtime. Outside a runtime the entry
    /// is still marked pending but no fetch happens.
    pub fn request(&self, source: TileAddress) -> bool {
        let key = source.cache_key();
        match self.entries.entry(key.clone()) {
            Entry::Occupied(_) => {
                self.metrics.elevation_dedup_hit();
                return false;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ElevationEntry::Pending);
            }
        }
        self.metrics.elevation_requested();
        debug!(tile = %source, "Requesting elevation");

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(tile = %source, "No async runtime, elevation request left pending");
                self.metrics.elevation_failed();
                return true;
            }
        };

        let fetch = self.fetcher.fetch(source);
        let entries = Arc::clone(&self.entries);
        let in_flight = Arc::clone(&self.in_flight);
        let metrics = Arc::clone(&self.metrics);
        let exaggeration = self.exaggeration;
        in_flight.fetch_add(1, Ordering::SeqCst);

        handle.spawn(async move {
            match fetch.await.and_then(|values| prepare(values, exaggeration)) {
                Ok(values) => {
                    let grid = Arc::new(ElevationGrid::new(source.level(), values));
                    if let Some(mut entry) = entries.get_mut(&key) {
                        if !entry.is_resolved() {
                            *entry = ElevationEntry::Resolved(grid);
                        }
                    }
                    metrics.elevation_resolved();
                    debug!(tile = %source, "Elevation resolved");
                }
                Err(e) => {
                    metrics.elevation_failed();
                    warn!(tile = %source, error = %e, "Elevation fetch failed");
                }
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
        true
    }

    /// Stores a grid for `source` without fetching.
    ///
    /// Replaces a missing or pending entry. Returns `Ok(false)` and leaves the
    /// cache untouched if the entry is already resolved.
    ///
    /// # Errors
    ///
    /// Returns [`ElevationError::WrongSampleCount`] unless `values` holds
    /// 81×81 samples.
    pub fn seed(&self, source: TileAddress, values: Vec<f64>) -> Result<bool, ElevationError> {
        let values = prepare(values, self.exaggeration)?;
        let grid = Arc::new(ElevationGrid::new(source.level(), values));
        let mut entry = self
            .entries
            .entry(source.cache_key())
            .or_insert(ElevationEntry::Missing);
        if entry.is_resolved() {
            return Ok(false);
        }
        *entry = ElevationEntry::Resolved(grid);
        Ok(true)
    }

    /// Current state of the entry for `source`.
    pub fn entry(&self, source: TileAddress) -> ElevationEntry {
        self.entries
            .get(&source.cache_key())
            .map(|e| e.value().clone())
            .unwrap_or(ElevationEntry::Missing)
    }

    /// Exact 11×11 grid for `address`, cut from its elevation tile's grid.
    ///
    /// `None` if `address` is at or above the base level or the elevation tile
    /// is not resolved.
    pub fn exact_elevation(&self, address: TileAddress) -> Option<ElevationGrid> {
        let source = address.elevation_ancestor(self.base_level)?;
        let entry = self.entries.get(&source.cache_key())?;
        let ElevationEntry::Resolved(grid) = entry.value() else {
            return None;
        };
        let values = extract_exact(grid.values(), source, address)?;
        Some(ElevationGrid::new(source.level(), values))
    }

    /// Interpolated 11×11 grid for `address`.
    ///
    /// Starts from the exact grid of the elevation tile serving `address`
    /// (itself cut from the next coarser fetched grid) and refines it once per
    /// level down to `address`. The result's source level is that of the coarser
    /// fetched grid.
    pub fn linear_elevation(&self, address: TileAddress) -> Option<ElevationGrid> {
        let elevation_tile = address.elevation_ancestor(self.base_level)?;
        let exact = self.exact_elevation(elevation_tile)?;
        let path = quadrant_path(address, elevation_tile.level());
        let values = refine_path(exact.values(), &path);
        Some(ElevationGrid::new(exact.source_level(), values))
    }

    /// Best available grid for `address`: exact, else interpolated.
    pub fn elevation_for(&self, address: TileAddress) -> Option<ElevationGrid> {
        self.exact_elevation(address)
            .or_else(|| self.linear_elevation(address))
    }

    /// Number of entries still pending.
    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.value(), ElevationEntry::Pending))
            .count()
    }

    pub fn resolved_count(&self) -> usize {
        self.entries.iter().filter(|e| e.value().is_resolved()).count()
    }

    /// Fetch tasks that have not completed yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Checks the sample count and applies exaggeration.
fn prepare(mut values: Vec<f64>, exaggeration: f64) -> Result<Vec<f64>, ElevationError> {
    if values.len() != FETCH_SAMPLE_COUNT {
        return Err(ElevationError::WrongSampleCount {
            expected: FETCH_SAMPLE_COUNT,
            actual: values.len(),
        });
    }
    if exaggeration != 1.0 {
        values.iter_mut().for_each(|v| *v *= exaggeration);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::grid::{FETCH_WIDTH, TILE_SAMPLE_COUNT, TILE_WIDTH};
    use crate::elevation::BoxFuture;
    use crate::tile::Quadrant;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Fetcher returning indexed grids, optionally held back by a gate.
    struct MockFetcher {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        fail: bool,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: None,
                fail: false,
            }
        }
    }

    impl ElevationFetcher for MockFetcher {
        fn fetch(&self, _address: TileAddress) -> BoxFuture<'static, Result<Vec<f64>, ElevationError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gate.clone();
            let fail = self.fail;
            Box::pin(async move {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                if fail {
                    return Err(ElevationError::Status(500));
                }
                Ok(indexed_grid())
            })
        }
    }

    fn indexed_grid() -> Vec<f64> {
        (0..FETCH_SAMPLE_COUNT).map(|i| i as f64).collect()
    }

    fn addr(level: u32, row: u32, column: u32) -> TileAddress {
        TileAddress::new(level, row, column).unwrap()
    }

    fn cache_with(fetcher: Arc<MockFetcher>) -> ElevationCache {
        ElevationCache::new(fetcher, 7, 1.0, Arc::new(GlobeMetrics::new()))
    }

    async fn settle(cache: &ElevationCache) {
        for _ in 0..200 {
            if cache.in_flight() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("fetches did not settle");
    }

    #[tokio::test]
    async fn test_request_for_tile_fetches_ancestor() {
        let fetcher = Arc::new(MockFetcher::new());
        let cache = cache_with(Arc::clone(&fetcher));

        assert!(cache.request_for_tile(addr(10, 5, 9)));
        assert_eq!(cache.entry(addr(7, 0, 1)), ElevationEntry::Pending);
        settle(&cache).await;

        assert!(cache.entry(addr(7, 0, 1)).is_resolved());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        let grid = cache.exact_elevation(addr(10, 5, 9)).unwrap();
        let start = 5 * 10 * FETCH_WIDTH + 10;
        assert_eq!(grid.source_level(), 7);
        assert_eq!(grid.values()[0], start as f64);
        assert_eq!(grid.values()[TILE_WIDTH], (start + FETCH_WIDTH) as f64);
    }

    #[tokio::test]
    async fn test_duplicate_requests_issue_one_fetch() {
        let gate = Arc::new(Notify::new());
        let fetcher = Arc::new(MockFetcher {
            gate: Some(Arc::clone(&gate)),
            ..MockFetcher::new()
        });
        let cache = cache_with(Arc::clone(&fetcher));

        assert!(cache.request_for_tile(addr(10, 5, 9)));
        assert!(!cache.request_for_tile(addr(10, 5, 9)));
        assert!(!cache.request_for_tile(addr(9, 2, 4)));
        assert_eq!(cache.pending_count(), 1);

        gate.notify_one();
        settle(&cache).await;
        assert!(!cache.request_for_tile(addr(8, 1, 2)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.resolved_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_stays_pending() {
        let fetcher = Arc::new(MockFetcher {
            fail: true,
            ..MockFetcher::new()
        });
        let metrics = Arc::new(GlobeMetrics::new());
        let cache = ElevationCache::new(fetcher.clone(), 7, 1.0, Arc::clone(&metrics));

        cache.request(addr(7, 0, 1));
        settle(&cache).await;

        assert_eq!(cache.entry(addr(7, 0, 1)), ElevationEntry::Pending);
        assert!(!cache.request(addr(7, 0, 1)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.snapshot().elevation_failed, 1);
        assert!(cache.elevation_for(addr(10, 5, 9)).is_none());
    }

    #[test]
    fn test_request_without_runtime_marks_pending() {
        let fetcher = Arc::new(MockFetcher::new());
        let cache = cache_with(Arc::clone(&fetcher));

        assert!(cache.request(addr(7, 0, 1)));
        assert_eq!(cache.entry(addr(7, 0, 1)), ElevationEntry::Pending);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_shallow_tiles_never_request() {
        let cache = cache_with(Arc::new(MockFetcher::new()));
        assert!(!cache.request_for_tile(addr(7, 0, 1)));
        assert!(!cache.request_for_tile(addr(3, 1, 1)));
        assert!(cache.is_empty());
        assert!(cache.elevation_for(addr(7, 0, 1)).is_none());
    }

    #[test]
    fn test_seed_never_overwrites() {
        let cache = cache_with(Arc::new(MockFetcher::new()));
        assert!(cache.seed(addr(7, 0, 1), indexed_grid()).unwrap());
        assert!(!cache.seed(addr(7, 0, 1), vec![0.0; FETCH_SAMPLE_COUNT]).unwrap());

        let grid = cache.exact_elevation(addr(8, 0, 2)).unwrap();
        assert_eq!(grid.values()[1], 4.0);
    }

    #[test]
    fn test_seed_rejects_wrong_length() {
        let cache = cache_with(Arc::new(MockFetcher::new()));
        let err = cache.seed(addr(7, 0, 1), vec![0.0; 10]).unwrap_err();
        assert!(matches!(err, ElevationError::WrongSampleCount { actual: 10, .. }));
        assert_eq!(cache.entry(addr(7, 0, 1)), ElevationEntry::Missing);
    }

    #[test]
    fn test_seed_applies_exaggeration() {
        let cache = ElevationCache::new(
            Arc::new(MockFetcher::new()),
            7,
            2.0,
            Arc::new(GlobeMetrics::new()),
        );
        cache.seed(addr(7, 0, 0), indexed_grid()).unwrap();
        let grid = cache.exact_elevation(addr(10, 0, 0)).unwrap();
        assert_eq!(grid.values()[1], 2.0);
    }

    #[test]
    fn test_linear_elevation_refines_exact_ancestor() {
        let cache = cache_with(Arc::new(MockFetcher::new()));
        cache.seed(addr(7, 0, 1), indexed_grid()).unwrap();

        // (11, 11, 19) is served by (10, 5, 9), whose own fetch is missing.
        let tile = addr(11, 11, 19);
        assert!(cache.exact_elevation(tile).is_none());
        let linear = cache.linear_elevation(tile).unwrap();
        let parent = cache.exact_elevation(addr(10, 5, 9)).unwrap();

        assert_eq!(linear.source_level(), 7);
        assert_eq!(linear.values().len(), TILE_SAMPLE_COUNT);
        assert_eq!(
            linear.values(),
            refine_path(parent.values(), &[Quadrant::BottomRight]).as_slice()
        );
        assert_eq!(cache.elevation_for(tile), Some(linear));
    }

    #[test]
    fn test_elevation_for_prefers_exact() {
        let cache = cache_with(Arc::new(MockFetcher::new()));
        cache.seed(addr(7, 0, 1), indexed_grid()).unwrap();
        cache.seed(addr(10, 5, 9), vec![1.0; FETCH_SAMPLE_COUNT]).unwrap();

        let grid = cache.elevation_for(addr(12, 20, 36)).unwrap();
        assert_eq!(grid.source_level(), 10);
        assert!(grid.values().iter().all(|v| *v == 1.0));
    }

    #[test]
    fn test_linear_needs_coarser_grid() {
        let cache = cache_with(Arc::new(MockFetcher::new()));
        // Only (10, 5, 9) is known. Interpolating (11, 11, 19) needs the exact
        // grid of (10, 5, 9), which is cut from the missing (7, 0, 1).
        cache.seed(addr(10, 5, 9), indexed_grid()).unwrap();
        assert!(cache.linear_elevation(addr(11, 11, 19)).is_none());
        assert!(cache.exact_elevation(addr(11, 11, 19)).is_some());
        assert!(cache.linear_elevation(addr(14, 80, 144)).is_some());
    }
}
