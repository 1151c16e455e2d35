//! INI configuration file.
//!
//! Lives at `~/.config/globelayer/config.ini` on Linux (the platform config
//! directory elsewhere):
//!
//! ```ini
//! [globe]
//! max_level = 15
//! look_ahead = 3
//! refresh_interval_ms = 300
//! flat_base_level = 6
//! earth_radius = 6378137
//!
//! [terrain]
//! enabled = true
//! level = 10
//! pitch = 80
//!
//! [elevation]
//! base_level = 7
//! url = https://sampleserver4.arcgisonline.com/...
//! exaggeration = 1
//! timeout_secs = 30
//!
//! [imagery]
//! url = https://server.arcgisonline.com/.../tile/{z}/{y}/{x}
//! cache_size_mb = 256
//!
//! [logging]
//! filter = globelayer=info
//! directory = ~/.cache/globelayer/logs
//! ```
//!
//! Missing keys take their defaults; a present key that does not parse is an
//! error.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::{
    GlobeConfig, DEFAULT_ELEVATION_BASE_LEVEL, DEFAULT_FLAT_BASE_LEVEL, DEFAULT_LOOK_AHEAD,
    DEFAULT_MAX_LEVEL, DEFAULT_REFRESH_INTERVAL, DEFAULT_TERRAIN_LEVEL, DEFAULT_TERRAIN_PITCH,
};
use crate::coord::EARTH_RADIUS;
use crate::elevation::DEFAULT_ELEVATION_URL;
use crate::provider::{ARCGIS_WORLD_IMAGERY_URL, DEFAULT_TIMEOUT_SECS};

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "globelayer=info";

/// Errors reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(String),

    #[error("invalid value for [{section}] {key}: {value}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    #[error("could not determine the user configuration directory")]
    NoConfigDir,
}

impl From<ini::Error> for ConfigError {
    fn from(err: ini::Error) -> Self {
        match err {
            ini::Error::Io(e) => ConfigError::Io(e),
            ini::Error::Parse(e) => ConfigError::Parse(e.to_string()),
        }
    }
}

/// `[globe]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeSettings {
    pub max_level: u32,
    pub look_ahead: u32,
    pub refresh_interval_ms: u64,
    pub flat_base_level: u32,
    pub earth_radius: f64,
}

impl Default for GlobeSettings {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_LEVEL,
            look_ahead: DEFAULT_LOOK_AHEAD,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL.as_millis() as u64,
            flat_base_level: DEFAULT_FLAT_BASE_LEVEL,
            earth_radius: EARTH_RADIUS,
        }
    }
}

/// `[terrain]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainSettings {
    pub enabled: bool,
    pub level: u32,
    pub pitch: f64,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: DEFAULT_TERRAIN_LEVEL,
            pitch: DEFAULT_TERRAIN_PITCH,
        }
    }
}

/// `[elevation]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationSettings {
    pub base_level: u32,
    pub url: String,
    pub exaggeration: f64,
    pub timeout_secs: u64,
}

impl Default for ElevationSettings {
    fn default() -> Self {
        Self {
            base_level: DEFAULT_ELEVATION_BASE_LEVEL,
            url: DEFAULT_ELEVATION_URL.to_string(),
            exaggeration: 1.0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[imagery]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagerySettings {
    /// XYZ URL template with `{z}`, `{y}` and `{x}`.
    pub url: String,
    pub cache_size_mb: u64,
}

impl ImagerySettings {
    /// Texture cache capacity in bytes, saturating on overflow.
    pub fn cache_capacity_bytes(&self) -> u64 {
        self.cache_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ImagerySettings {
    fn default() -> Self {
        Self {
            url: ARCGIS_WORLD_IMAGERY_URL.to_string(),
            cache_size_mb: 256,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub filter: String,
    pub directory: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            directory: dirs::cache_dir()
                .map(|d| d.join("globelayer").join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs")),
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub globe: GlobeSettings,
    pub terrain: TerrainSettings,
    pub elevation: ElevationSettings,
    pub imagery: ImagerySettings,
    pub logging: LoggingSettings,
}

/// Platform location of the configuration file.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|d| d.join("globelayer").join("config.ini"))
        .ok_or(ConfigError::NoConfigDir)
}

impl ConfigFile {
    /// Reads `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini)
    }

    /// Reads `path`, or returns defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses configuration from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let globe = GlobeSettings {
            max_level: value(ini, "globe", "max_level", defaults.globe.max_level)?,
            look_ahead: value(ini, "globe", "look_ahead", defaults.globe.look_ahead)?,
            refresh_interval_ms: value(
                ini,
                "globe",
                "refresh_interval_ms",
                defaults.globe.refresh_interval_ms,
            )?,
            flat_base_level: value(ini, "globe", "flat_base_level", defaults.globe.flat_base_level)?,
            earth_radius: value(ini, "globe", "earth_radius", defaults.globe.earth_radius)?,
        };
        let terrain = TerrainSettings {
            enabled: value(ini, "terrain", "enabled", defaults.terrain.enabled)?,
            level: value(ini, "terrain", "level", defaults.terrain.level)?,
            pitch: value(ini, "terrain", "pitch", defaults.terrain.pitch)?,
        };
        let elevation = ElevationSettings {
            base_level: value(ini, "elevation", "base_level", defaults.elevation.base_level)?,
            url: string(ini, "elevation", "url", defaults.elevation.url),
            exaggeration: value(ini, "elevation", "exaggeration", defaults.elevation.exaggeration)?,
            timeout_secs: value(ini, "elevation", "timeout_secs", defaults.elevation.timeout_secs)?,
        };
        let imagery = ImagerySettings {
            url: string(ini, "imagery", "url", defaults.imagery.url),
            cache_size_mb: value(ini, "imagery", "cache_size_mb", defaults.imagery.cache_size_mb)?,
        };
        let logging = LoggingSettings {
            filter: string(ini, "logging", "filter", defaults.logging.filter),
            directory: ini
                .get_from(Some("logging"), "directory")
                .map(PathBuf::from)
                .unwrap_or(defaults.logging.directory),
        };

        Ok(Self {
            globe,
            terrain,
            elevation,
            imagery,
            logging,
        })
    }

    /// Writes the file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_ini().write_to_file(path)?;
        Ok(())
    }

    /// Renders the configuration as INI text.
    pub fn to_ini_string(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.to_ini().write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("globe"))
            .set("max_level", self.globe.max_level.to_string())
            .set("look_ahead", self.globe.look_ahead.to_string())
            .set("refresh_interval_ms", self.globe.refresh_interval_ms.to_string())
            .set("flat_base_level", self.globe.flat_base_level.to_string())
            .set("earth_radius", self.globe.earth_radius.to_string());
        ini.with_section(Some("terrain"))
            .set("enabled", self.terrain.enabled.to_string())
            .set("level", self.terrain.level.to_string())
            .set("pitch", self.terrain.pitch.to_string());
        ini.with_section(Some("elevation"))
            .set("base_level", self.elevation.base_level.to_string())
            .set("url", self.elevation.url.as_str())
            .set("exaggeration", self.elevation.exaggeration.to_string())
            .set("timeout_secs", self.elevation.timeout_secs.to_string());
        ini.with_section(Some("imagery"))
            .set("url", self.imagery.url.as_str())
            .set("cache_size_mb", self.imagery.cache_size_mb.to_string());
        ini.with_section(Some("logging"))
            .set("filter", self.logging.filter.as_str())
            .set("directory", self.logging.directory.display().to_string());
        ini
    }

    /// Builds the engine configuration.
    ///
    /// # Errors
    ///
    /// Fails if the resulting configuration does not validate.
    pub fn to_globe_config(&self) -> Result<GlobeConfig, ConfigError> {
        let config = GlobeConfig {
            elevation_base_level: self.elevation.base_level,
            terrain_level: self.terrain.level,
            flat_base_level: self.globe.flat_base_level,
            max_level: self.globe.max_level,
            look_ahead: self.globe.look_ahead,
            refresh_interval: Duration::from_millis(self.globe.refresh_interval_ms),
            terrain_enabled: self.terrain.enabled,
            terrain_pitch: self.terrain.pitch,
            earth_radius: self.globe.earth_radius,
            elevation_exaggeration: self.elevation.exaggeration,
            elevation_url: self.elevation.url.clone(),
            http_timeout: Duration::from_secs(self.elevation.timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }
}

fn value<T>(ini: &Ini, section: &str, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match ini.get_from(Some(section), key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn string(ini: &Ini, section: &str, key: &str, default: String) -> String {
    ini.get_from(Some(section), key)
        .map(str::to_string)
        .unwrap_or(default)
}
