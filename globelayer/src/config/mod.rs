//! Engine configuration.
//!
//! [`GlobeConfig`] carries every tunable the engine reads at runtime. It is
//! built either in code through the `with_*` methods or from the user's INI
//! file through [`ConfigFile::to_globe_config`].

mod file;

pub use file::{
    default_config_path, ConfigError, ConfigFile, ElevationSettings, GlobeSettings,
    ImagerySettings, LoggingSettings, TerrainSettings, DEFAULT_LOG_FILTER,
};

use std::time::Duration;

use crate::coord::EARTH_RADIUS;
use crate::elevation::DEFAULT_ELEVATION_URL;
use crate::provider::DEFAULT_TIMEOUT_SECS;
use crate::tile::MAX_ADDRESS_LEVEL;

/// First level of the elevation pyramid.
pub const DEFAULT_ELEVATION_BASE_LEVEL: u32 = 7;

/// Shallowest level that may render as terrain.
pub const DEFAULT_TERRAIN_LEVEL: u32 = 10;

/// Level below which flat tiles get extra subdivisions.
pub const DEFAULT_FLAT_BASE_LEVEL: u32 = 6;

/// Highest accepted `flat_base_level`; level 0 then gets a 1024×1024 patch.
pub const MAX_FLAT_BASE_LEVEL: u32 = 10;

/// Deepest level `set_level` accepts.
pub const DEFAULT_MAX_LEVEL: u32 = 15;

/// Levels beyond the current level that are kept resident.
pub const DEFAULT_LOOK_AHEAD: u32 = 3;

/// Period of the background refresh tick.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(300);

/// Pitch at or below which terrain layers draw with depth testing.
pub const DEFAULT_TERRAIN_PITCH: f64 = 80.0;

/// Runtime settings for a [`Globe`](crate::globe::Globe).
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeConfig {
    pub elevation_base_level: u32,
    pub terrain_level: u32,
    pub flat_base_level: u32,
    pub max_level: u32,
    pub look_ahead: u32,
    pub refresh_interval: Duration,
    pub terrain_enabled: bool,
    pub terrain_pitch: f64,
    pub earth_radius: f64,
    pub elevation_exaggeration: f64,
    pub elevation_url: String,
    pub http_timeout: Duration,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            elevation_base_level: DEFAULT_ELEVATION_BASE_LEVEL,
            terrain_level: DEFAULT_TERRAIN_LEVEL,
            flat_base_level: DEFAULT_FLAT_BASE_LEVEL,
            max_level: DEFAULT_MAX_LEVEL,
            look_ahead: DEFAULT_LOOK_AHEAD,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            terrain_enabled: true,
            terrain_pitch: DEFAULT_TERRAIN_PITCH,
            earth_radius: EARTH_RADIUS,
            elevation_exaggeration: 1.0,
            elevation_url: DEFAULT_ELEVATION_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GlobeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elevation_base_level(mut self, level: u32) -> Self {
        self.elevation_base_level = level;
        self
    }

    pub fn with_terrain_level(mut self, level: u32) -> Self {
        self.terrain_level = level;
        self
    }

    pub fn with_flat_base_level(mut self, level: u32) -> Self {
        self.flat_base_level = level;
        self
    }

    pub fn with_max_level(mut self, level: u32) -> Self {
        self.max_level = level;
        self
    }

    pub fn with_look_ahead(mut self, levels: u32) -> Self {
        self.look_ahead = levels;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_terrain_enabled(mut self, enabled: bool) -> Self {
        self.terrain_enabled = enabled;
        self
    }

    pub fn with_terrain_pitch(mut self, pitch: f64) -> Self {
        self.terrain_pitch = pitch;
        self
    }

    pub fn with_earth_radius(mut self, radius: f64) -> Self {
        self.earth_radius = radius;
        self
    }

    pub fn with_elevation_exaggeration(mut self, factor: f64) -> Self {
        self.elevation_exaggeration = factor;
        self
    }

    pub fn with_elevation_url(mut self, url: impl Into<String>) -> Self {
        self.elevation_url = url.into();
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Deepest level ever made resident: `max_level + look_ahead`.
    pub fn deepest_level(&self) -> u32 {
        self.max_level + self.look_ahead
    }

    /// Checks values that would break the engine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |section: &str, key: &str, value: String| ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value,
        };
        if self.deepest_level() > MAX_ADDRESS_LEVEL {
            return Err(invalid(
                "globe",
                "max_level",
                format!("{} (+{} look-ahead exceeds {})", self.max_level, self.look_ahead, MAX_ADDRESS_LEVEL),
            ));
        }
        if self.flat_base_level > MAX_FLAT_BASE_LEVEL {
            return Err(invalid(
                "globe",
                "flat_base_level",
                format!("{} (maximum {})", self.flat_base_level, MAX_FLAT_BASE_LEVEL),
            ));
        }
        if self.terrain_level <= self.elevation_base_level {
            return Err(invalid(
                "terrain",
                "level",
                format!(
                    "{} (must exceed elevation base level {})",
                    self.terrain_level, self.elevation_base_level
                ),
            ));
        }
        if self.refresh_interval.is_zero() {
            return Err(invalid("globe", "refresh_interval_ms", "0".to_string()));
        }
        if !(self.earth_radius.is_finite() && self.earth_radius > 0.0) {
            return Err(invalid("globe", "earth_radius", self.earth_radius.to_string()));
        }
        if !self.elevation_exaggeration.is_finite() {
            return Err(invalid(
                "elevation",
                "exaggeration",
                self.elevation_exaggeration.to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GlobeConfig::default();
        assert_eq!(config.elevation_base_level, 7);
        assert_eq!(config.terrain_level, 10);
        assert_eq!(config.flat_base_level, 6);
        assert_eq!(config.max_level, 15);
        assert_eq!(config.look_ahead, 3);
        assert_eq!(config.refresh_interval, Duration::from_millis(300));
        assert!(config.terrain_enabled);
        assert_eq!(config.terrain_pitch, 80.0);
        assert_eq!(config.earth_radius, 6_378_137.0);
        assert_eq!(config.elevation_exaggeration, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = GlobeConfig::new()
            .with_max_level(12)
            .with_terrain_enabled(false)
            .with_elevation_exaggeration(2.5)
            .with_refresh_interval(Duration::from_millis(50));
        assert_eq!(config.max_level, 12);
        assert_eq!(config.deepest_level(), 15);
        assert!(!config.terrain_enabled);
        assert_eq!(config.elevation_exaggeration, 2.5);
        assert_eq!(config.refresh_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_level_builders() {
        let config = GlobeConfig::new()
            .with_elevation_base_level(4)
            .with_terrain_level(8)
            .with_flat_base_level(3)
            .with_look_ahead(1)
            .with_terrain_pitch(70.0)
            .with_earth_radius(1_000.0)
            .with_http_timeout(Duration::from_secs(5));
        assert_eq!(config.elevation_base_level, 4);
        assert_eq!(config.terrain_level, 8);
        assert_eq!(config.flat_base_level, 3);
        assert_eq!(config.deepest_level(), 16);
        assert_eq!(config.terrain_pitch, 70.0);
        assert_eq!(config.earth_radius, 1_000.0);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_radius() {
        let err = GlobeConfig::new().with_earth_radius(-1.0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "earth_radius"));
    }

    #[test]
    fn test_validate_rejects_dense_flat_base() {
        assert!(GlobeConfig::new().with_flat_base_level(MAX_FLAT_BASE_LEVEL).validate().is_ok());
        let err = GlobeConfig::new().with_flat_base_level(40).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "flat_base_level"));
    }

    #[test]
    fn test_validate_rejects_terrain_at_or_below_elevation_base() {
        for level in [3, DEFAULT_ELEVATION_BASE_LEVEL] {
            let err = GlobeConfig::new().with_terrain_level(level).validate().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "level"));
        }
        assert!(GlobeConfig::new()
            .with_terrain_level(DEFAULT_ELEVATION_BASE_LEVEL + 1)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_too_deep() {
        let err = GlobeConfig::new().with_max_level(29).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "max_level"));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = GlobeConfig::new().with_refresh_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
