//! Engine configuration.
//!
//! Wraps the terrain settings with the headless run loop's own parameters.
//! Configuration is loaded from and saved to a TOML file.

use std::fs;
use std::path::Path;

use glam::Vec2;
use horizon_common::{ConfigError, HorizonResult};
use horizon_world::TerrainConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Configuration file used when none is given on the command line.
pub const CONFIG_FILE: &str = "horizon.toml";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Loop Settings ===
    /// Streaming ticks per second
    pub ticks_per_second: u32,
    /// Ticks to run before exiting (0 = until the path ends)
    pub run_ticks: u64,
    /// Ticks between progress log lines (0 = never)
    pub stats_interval: u32,

    // === Observer Settings ===
    /// Observer speed in world units per second
    pub observer_speed: f32,
    /// Waypoints the observer walks through, in order
    pub observer_path: Vec<[f32; 2]>,

    // === Terrain ===
    /// Terrain streaming settings
    pub terrain: TerrainConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 60,
            run_ticks: 0,
            stats_interval: 60,

            observer_speed: 240.0,
            observer_path: vec![[0.0, 0.0], [960.0, 0.0], [960.0, 960.0], [0.0, 960.0]],

            terrain: TerrainConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    ///
    /// Returns the default config if the file doesn't exist. A file that
    /// exists but cannot be read or parsed is an error.
    pub fn load_from<P: AsRef<Path>>(path: P) -> HorizonResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> HorizonResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.ticks_per_second = self.ticks_per_second.clamp(1, 240);
        if !self.observer_speed.is_finite() || self.observer_speed < 0.0 {
            self.observer_speed = 0.0;
        }
        if self.observer_path.is_empty() {
            self.observer_path.push([0.0, 0.0]);
        }
        self.terrain.sanitize();
    }

    /// Observer waypoints as vectors.
    #[must_use]
    pub fn waypoints(&self) -> Vec<Vec2> {
        self.observer_path.iter().map(|&[x, y]| Vec2::new(x, y)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_common::HorizonError;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.ticks_per_second, 60);
        assert_eq!(config.terrain.chunk_resolution, 241);
        assert_eq!(config.waypoints().first(), Some(&Vec2::ZERO));
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.ticks_per_second = 0;
        config.observer_speed = -3.0;
        config.observer_path.clear();
        config.terrain.viewer_move_threshold = f32::NAN;

        config.validate();

        assert_eq!(config.ticks_per_second, 1);
        assert_eq!(config.observer_speed, 0.0);
        assert_eq!(config.observer_path, vec![[0.0, 0.0]]);
        assert_eq!(config.terrain.viewer_move_threshold, 0.0);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("test_config.toml");

        let mut config = EngineConfig::default();
        config.run_ticks = 300;
        config.terrain.noise.seed = 77;
        config.terrain.max_generation_retries = 5;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path).expect("Failed to load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/config.toml").expect("defaults");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_load_malformed_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "ticks_per_second = \"fast\"").expect("write");

        let result = EngineConfig::load_from(&config_path);
        assert!(matches!(result, Err(HorizonError::Config(ConfigError::Parse(_)))));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "run_ticks = 10\n\n[terrain]\nviewer_move_threshold = 0.0\n").expect("write");

        let config = EngineConfig::load_from(&config_path).expect("load");
        assert_eq!(config.run_ticks, 10);
        assert_eq!(config.terrain.viewer_move_threshold, 0.0);
        assert_eq!(config.terrain.detail_levels.len(), 3);
    }

    #[test]
    fn test_config_toml_serialization() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("Failed to serialize");

        assert!(toml_str.contains("ticks_per_second"));
        assert!(toml_str.contains("[terrain]"));
    }
}
