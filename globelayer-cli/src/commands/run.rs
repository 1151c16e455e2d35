//! Run command - drive a globe headlessly against live imagery and elevation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use globelayer::camera::FootprintCamera;
use globelayer::config::{ConfigFile, GlobeConfig};
use globelayer::elevation::ArcGisElevationFetcher;
use globelayer::globe::{Globe, GlobeDriver, GlobeServices, DEFAULT_COMMAND_CHANNEL_CAPACITY};
use globelayer::logging::{init_logging, log_file_path};
use globelayer::provider::{AsyncReqwestClient, XyzImageSource};
use globelayer::render::{RecordingAllocator, RecordingTarget};
use globelayer::texture::HttpTextureLoader;
use globelayer::tile::TileKind;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;

/// Arguments for the run command.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub lat: f64,
    pub lon: f64,
    pub level: u32,
    pub pitch: f64,
    pub seconds: Option<u64>,
    pub no_terrain: bool,
    pub image_url: Option<String>,
    pub elevation_url: Option<String>,
}

/// Run the run command.
pub fn run(args: RunArgs, config_path: &Path) -> Result<(), CliError> {
    let file = ConfigFile::load_or_default(config_path)?;
    let _log_guard = init_logging(&file.logging)?;
    let config = resolve_config(&args, &file)?;

    if args.level > config.max_level {
        warn!(
            requested = args.level,
            max_level = config.max_level,
            "Level above maximum, clamping"
        );
    }

    let image_url = args.image_url.clone().unwrap_or_else(|| file.imagery.url.clone());
    let image_source = XyzImageSource::new("imagery", image_url)?;
    let client = AsyncReqwestClient::with_timeout(config.http_timeout.as_secs())?;
    let fetcher = ArcGisElevationFetcher::new(client.clone(), &config.elevation_url)?;
    let textures = HttpTextureLoader::with_capacity(client, file.imagery.cache_capacity_bytes());
    let recorder = Arc::new(RecordingAllocator::new());
    let services = GlobeServices::new(&config, Arc::new(fetcher), Arc::new(textures), recorder.clone());
    let camera = FootprintCamera::new(args.lon, args.lat).with_pitch(args.pitch);

    println!("GlobeLayer v{}", globelayer::VERSION);
    println!("================");
    println!();
    println!("Center:    {:.4}, {:.4}", args.lat, args.lon);
    println!("Level:     {} (max {})", args.level.min(config.max_level), config.max_level);
    println!("Pitch:     {:.1}°", args.pitch);
    println!("Terrain:   {}", if config.terrain_enabled { "enabled" } else { "disabled" });
    println!("Imagery:   {}", image_source.template());
    println!("Elevation: {}", config.elevation_url);
    println!("Log file:  {}", log_file_path(&file.logging).display());
    println!();
    match args.seconds {
        Some(seconds) => println!("Running for {} seconds (Ctrl+C to stop early)...", seconds),
        None => println!("Running until Ctrl+C..."),
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, stopping...");
        signal.cancel();
    })
    .map_err(|e| CliError::Runtime(format!("Failed to set signal handler: {}", e)))?;

    let duration = args.seconds.map(Duration::from_secs);
    let globe = runtime.block_on(async {
        let globe = Globe::new(config, camera, Arc::new(image_source), services)?;
        let (driver, handle) = GlobeDriver::new(globe, DEFAULT_COMMAND_CHANNEL_CAPACITY);
        let task = tokio::spawn(driver.run(shutdown.clone()));

        handle.set_level(args.level).await?;
        match duration {
            Some(duration) => {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {}
                    _ = shutdown.cancelled() => {}
                }
            }
            None => shutdown.cancelled().await,
        }
        shutdown.cancel();

        task.await
            .map_err(|e| CliError::Runtime(format!("Globe driver failed: {}", e)))
    })?;

    print_summary(&globe, &recorder);
    info!("Run complete");
    Ok(())
}

/// Builds the engine configuration from the file and command-line overrides.
fn resolve_config(args: &RunArgs, file: &ConfigFile) -> Result<GlobeConfig, CliError> {
    let mut config = file.to_globe_config()?;
    if args.no_terrain {
        config = config.with_terrain_enabled(false);
    }
    if let Some(url) = &args.elevation_url {
        config = config.with_elevation_url(url.clone());
    }
    if !(0.0..=90.0).contains(&args.pitch) {
        return Err(CliError::Config(format!(
            "pitch must be between 0 and 90 degrees, got {}",
            args.pitch
        )));
    }
    if !(-90.0..=90.0).contains(&args.lat) || !(-180.0..=180.0).contains(&args.lon) {
        return Err(CliError::Config(format!(
            "invalid center {}, {}",
            args.lat, args.lon
        )));
    }
    Ok(config)
}

fn print_summary(globe: &Globe<FootprintCamera>, recorder: &RecordingAllocator) {
    println!();
    println!("Layers");
    println!("------");
    println!("{:>5}  {:>6}  {:>7}  {:>6}", "Level", "Tiles", "Terrain", "Hidden");
    for layer in globe.layers() {
        if layer.is_empty() {
            continue;
        }
        let terrain = layer.tiles().filter(|t| t.kind() == TileKind::Terrain).count();
        let hidden = layer.tiles().filter(|t| !t.is_visible()).count();
        println!(
            "{:>5}  {:>6}  {:>7}  {:>6}",
            layer.level(),
            layer.len(),
            terrain,
            hidden
        );
    }

    let mut target = RecordingTarget::new();
    globe.render(&mut target);

    println!();
    println!("Telemetry");
    println!("---------");
    println!("{}", globe.telemetry());
    println!("Draw calls:           {}", target.draw_count());
    println!("Live GPU buffers:     {}", recorder.live_count());
    println!(
        "Textures:             {}",
        if globe.all_loaded() { "all loaded" } else { "still loading" }
    );
}
