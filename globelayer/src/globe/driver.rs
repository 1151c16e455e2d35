//! Background task that owns a [`Globe`] and refreshes it on a timer.
//!
//! The driver serialises three event sources in one task: shutdown, commands
//! from any number of [`GlobeHandle`]s, and the refresh interval. Because the
//! globe is only ever touched from this task, refreshes never overlap.
//!
//! # Example
//!
//! ```ignore
//! let (driver, handle) = GlobeDriver::new(globe, DEFAULT_COMMAND_CHANNEL_CAPACITY);
//! let shutdown = CancellationToken::new();
//! let task = tokio::spawn(driver.run(shutdown.clone()));
//!
//! handle.set_level(6).await?;
//! let tiles = handle.query(|globe| globe.tile_count()).await?;
//!
//! shutdown.cancel();
//! let globe = task.await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::Globe;
use crate::camera::Camera;
use crate::provider::ImageSource;
use crate::telemetry::TelemetrySnapshot;

/// Default channel capacity for globe commands.
pub const DEFAULT_COMMAND_CHANNEL_CAPACITY: usize = 64;

type CameraUpdate<C> = Box<dyn FnOnce(&mut C) + Send>;
type GlobeQuery<C> = Box<dyn FnOnce(&Globe<C>) + Send>;

/// Work sent to a running [`GlobeDriver`].
pub enum GlobeCommand<C: Camera> {
    SetLevel(u32),
    SetImageSource(Arc<dyn ImageSource>),
    Refresh,
    CheckTerrain { force: bool },
    /// Mutates the camera. No refresh is implied.
    UpdateCamera(CameraUpdate<C>),
    /// Reads globe state from inside the driver task.
    Query(GlobeQuery<C>),
}

impl<C: Camera> GlobeCommand<C> {
    fn name(&self) -> &'static str {
        match self {
            Self::SetLevel(_) => "set_level",
            Self::SetImageSource(_) => "set_image_source",
            Self::Refresh => "refresh",
            Self::CheckTerrain { .. } => "check_terrain",
            Self::UpdateCamera(_) => "update_camera",
            Self::Query(_) => "query",
        }
    }
}

/// The driver stopped before the command could be handled.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("globe driver is not running")]
pub struct DriverClosed;

// =============================================================================
// Handle
// =============================================================================

/// Cloneable sender side of a [`GlobeDriver`].
pub struct GlobeHandle<C: Camera> {
    command_tx: mpsc::Sender<GlobeCommand<C>>,
}

impl<C: Camera> Clone for GlobeHandle<C> {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
        }
    }
}

impl<C: Camera + 'static> GlobeHandle<C> {
    /// Queues a command.
    pub async fn send(&self, command: GlobeCommand<C>) -> Result<(), DriverClosed> {
        self.command_tx.send(command).await.map_err(|_| DriverClosed)
    }

    pub async fn set_level(&self, level: u32) -> Result<(), DriverClosed> {
        self.send(GlobeCommand::SetLevel(level)).await
    }

    pub async fn set_image_source(&self, source: Arc<dyn ImageSource>) -> Result<(), DriverClosed> {
        self.send(GlobeCommand::SetImageSource(source)).await
    }

    pub async fn refresh(&self) -> Result<(), DriverClosed> {
        self.send(GlobeCommand::Refresh).await
    }

    pub async fn check_terrain(&self, force: bool) -> Result<(), DriverClosed> {
        self.send(GlobeCommand::CheckTerrain { force }).await
    }

    pub async fn update_camera<F>(&self, update: F) -> Result<(), DriverClosed>
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.send(GlobeCommand::UpdateCamera(Box::new(update))).await
    }

    /// Runs `read` against the globe and returns its result.
    pub async fn query<R, F>(&self, read: F) -> Result<R, DriverClosed>
    where
        R: Send + 'static,
        F: FnOnce(&Globe<C>) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(GlobeCommand::Query(Box::new(move |globe| {
            let _ = reply_tx.send(read(globe));
        })))
        .await?;
        reply_rx.await.map_err(|_| DriverClosed)
    }

    pub async fn telemetry(&self) -> Result<TelemetrySnapshot, DriverClosed> {
        self.query(|globe| globe.telemetry()).await
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Owns a [`Globe`] inside a tokio task.
pub struct GlobeDriver<C: Camera> {
    globe: Globe<C>,
    command_rx: mpsc::Receiver<GlobeCommand<C>>,
    refresh_interval: Duration,
}

impl<C: Camera + 'static> GlobeDriver<C> {
    /// Creates a driver and the handle that feeds it.
    ///
    /// The refresh period is taken from the globe's configuration.
    pub fn new(globe: Globe<C>, channel_capacity: usize) -> (Self, GlobeHandle<C>) {
        let (command_tx, command_rx) = mpsc::channel(channel_capacity.max(1));
        let refresh_interval = globe.config().refresh_interval;
        let driver = Self {
            globe,
            command_rx,
            refresh_interval,
        };
        (driver, GlobeHandle { command_tx })
    }

    /// Runs until `shutdown` is cancelled and hands the globe back.
    ///
    /// The first refresh happens immediately.
    pub async fn run(self, shutdown: CancellationToken) -> Globe<C> {
        info!(interval_ms = self.refresh_interval.as_millis() as u64, "Globe driver starting");

        let Self {
            mut globe,
            mut command_rx,
            refresh_interval,
        } = self;

        let mut ticker = tokio::time::interval(refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Globe driver shutting down");
                    break;
                }

                Some(command) = command_rx.recv() => {
                    Self::handle_command(&mut globe, command);
                }

                _ = ticker.tick() => {
                    globe.refresh();
                }
            }
        }

        info!(
            tiles = globe.tile_count(),
            refreshes = globe.telemetry().refreshes,
            "Globe driver stopped"
        );
        globe
    }

    fn handle_command(globe: &mut Globe<C>, command: GlobeCommand<C>) {
        debug!(command = command.name(), "Handling globe command");
        match command {
            GlobeCommand::SetLevel(level) => {
                globe.set_level(level);
            }
            GlobeCommand::SetImageSource(source) => globe.set_image_source(source),
            GlobeCommand::Refresh => globe.refresh(),
            GlobeCommand::CheckTerrain { force } => globe.check_terrain(force),
            GlobeCommand::UpdateCamera(update) => update(globe.camera_mut()),
            GlobeCommand::Query(read) => read(globe),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::FootprintCamera;
    use crate::config::GlobeConfig;
    use crate::elevation::{BoxFuture, ElevationError, ElevationFetcher};
    use crate::globe::GlobeServices;
    use crate::provider::XyzImageSource;
    use crate::render::RecordingAllocator;
    use crate::texture::PlaceholderTextureLoader;
    use crate::tile::TileAddress;

    struct OfflineFetcher;

    impl ElevationFetcher for OfflineFetcher {
        fn fetch(&self, _address: TileAddress) -> BoxFuture<'static, Result<Vec<f64>, ElevationError>> {
            Box::pin(async { Err(ElevationError::Http("offline".to_string())) })
        }
    }

    fn test_globe(interval: Duration) -> Globe<FootprintCamera> {
        let config = GlobeConfig::default().with_refresh_interval(interval);
        let services = GlobeServices::new(
            &config,
            Arc::new(OfflineFetcher),
            Arc::new(PlaceholderTextureLoader),
            Arc::new(RecordingAllocator::new()),
        );
        Globe::new(
            config,
            FootprintCamera::new(2.35, 48.85),
            Arc::new(XyzImageSource::arcgis_world_imagery()),
            services,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_driver_starts_and_stops() {
        let (driver, _handle) = GlobeDriver::new(test_globe(Duration::from_millis(300)), 8);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(driver.run(shutdown.clone()));

        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), task).await;
        assert!(result.is_ok(), "driver should stop on cancellation");
    }

    #[tokio::test]
    async fn test_commands_are_applied() {
        let (driver, handle) = GlobeDriver::new(test_globe(Duration::from_secs(60)), 8);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(driver.run(shutdown.clone()));

        handle.set_level(4).await.unwrap();
        let (level, deepest_layer) = handle
            .query(|globe| (globe.current_level(), globe.layer(7).map(|l| l.len())))
            .await
            .unwrap();
        assert_eq!(level, 4);
        assert!(deepest_layer.unwrap() > 0);

        handle.update_camera(|camera| camera.set_pitch(30.0)).await.unwrap();
        let pitch = handle.query(|globe| globe.camera().pitch_degrees()).await.unwrap();
        assert_eq!(pitch, 30.0);

        shutdown.cancel();
        let globe = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(globe.current_level(), 4);
    }

    #[tokio::test]
    async fn test_ticks_refresh_periodically() {
        let (driver, handle) = GlobeDriver::new(test_globe(Duration::from_millis(10)), 8);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(driver.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(80)).await;
        let snapshot = handle.telemetry().await.unwrap();
        assert!(snapshot.refreshes >= 2, "refreshes: {}", snapshot.refreshes);

        shutdown.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(1), task).await;
    }

    #[tokio::test]
    async fn test_handle_reports_closed_driver() {
        let (driver, handle) = GlobeDriver::new(test_globe(Duration::from_millis(300)), 8);
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let _globe = driver.run(shutdown).await;

        assert_eq!(handle.refresh().await, Err(DriverClosed));
        assert_eq!(handle.telemetry().await.unwrap_err(), DriverClosed);
    }
}
