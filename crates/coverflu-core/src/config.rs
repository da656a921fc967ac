use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Touch and fling tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Constant deceleration in tiles/s²
    #[serde(default = "default_friction")]
    pub friction: f64,
    /// Release speed limit in tiles/s
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    /// Tiles travelled when dragging across the full surface width
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    /// Movement in pixels (either axis) before a press becomes a drag
    #[serde(default = "default_touch_slop")]
    pub touch_slop: f32,
    /// Trailing window used to measure release velocity
    #[serde(default = "default_velocity_window")]
    pub velocity_window_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            friction: default_friction(),
            max_speed: default_max_speed(),
            sensitivity: default_sensitivity(),
            touch_slop: default_touch_slop(),
            velocity_window_ms: default_velocity_window(),
        }
    }
}

impl ScrollConfig {
    pub fn velocity_window(&self) -> Duration {
        Duration::from_millis(self.velocity_window_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of tiles held at once
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Remember tiles whose image was unavailable instead of retrying every frame
    #[serde(default)]
    pub cache_missing: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            cache_missing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Tiles drawn on each side of the centre tile
    #[serde(default = "default_visible_tiles")]
    pub visible_tiles: usize,
    /// Projection scale of the surface
    #[serde(default = "default_hit_scale")]
    pub hit_scale: f32,
    /// Fraction of the surface covered by the centre tile
    #[serde(default = "default_hit_fraction")]
    pub hit_fraction: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            visible_tiles: default_visible_tiles(),
            hit_scale: default_hit_scale(),
            hit_fraction: default_hit_fraction(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_friction() -> f64 {
    5.0
}

fn default_max_speed() -> f64 {
    6.0
}

fn default_sensitivity() -> f64 {
    1.5
}

fn default_touch_slop() -> f32 {
    5.0
}

fn default_velocity_window() -> u64 {
    100
}

fn default_capacity() -> usize {
    48
}

fn default_visible_tiles() -> usize {
    3
}

fn default_hit_scale() -> f32 {
    1.2
}

fn default_hit_fraction() -> f32 {
    0.45
}

impl AppConfig {
    /// Load configuration from the default path or return defaults
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from a specific file
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&config_path, self.to_toml()?)?;

        Ok(())
    }

    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Get the configuration file path
    /// Always uses ~/.config/coverflu/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("coverflu")
            .join("config.toml")
    }

    /// Reject values the physics and cache cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        let scroll = &self.scroll;
        if !(scroll.friction > 0.0 && scroll.friction.is_finite()) {
            return Err(crate::Error::Config(format!(
                "scroll.friction must be positive, got {}",
                scroll.friction
            )));
        }
        if !(scroll.max_speed > 0.0 && scroll.max_speed.is_finite()) {
            return Err(crate::Error::Config(format!(
                "scroll.max_speed must be positive, got {}",
                scroll.max_speed
            )));
        }
        if !(scroll.sensitivity > 0.0 && scroll.sensitivity.is_finite()) {
            return Err(crate::Error::Config(format!(
                "scroll.sensitivity must be positive, got {}",
                scroll.sensitivity
            )));
        }
        if scroll.touch_slop < 0.0 {
            return Err(crate::Error::Config(format!(
                "scroll.touch_slop must not be negative, got {}",
                scroll.touch_slop
            )));
        }
        if scroll.velocity_window_ms == 0 {
            return Err(crate::Error::Config(
                "scroll.velocity_window_ms must be at least 1".to_string(),
            ));
        }
        if self.cache.capacity == 0 {
            return Err(crate::Error::Config(
                "cache.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
