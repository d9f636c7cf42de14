//! Terrain streaming configuration.

use horizon_common::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::classify::{default_regions, Region};
use crate::height_field::NoiseSettings;
use crate::lod::{DetailLevel, DetailLevels};
use crate::mesh::MeshSettings;

/// Default samples per chunk edge. One less than this is the chunk size in
/// world units, and that edge length divides evenly by every vertex step up
/// to detail level 6.
pub const DEFAULT_CHUNK_RESOLUTION: u32 = 241;

/// Default observer travel before visible chunks are recomputed.
pub const DEFAULT_VIEWER_MOVE_THRESHOLD: f32 = 25.0;

/// Default number of times a failed request is resubmitted.
pub const DEFAULT_MAX_GENERATION_RETRIES: u32 = 2;

/// Terrain streaming parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Samples per chunk edge (fixed for a session)
    pub chunk_resolution: u32,
    /// Detail levels, ascending by distance threshold
    pub detail_levels: Vec<DetailLevel>,
    /// Height field noise
    pub noise: NoiseSettings,
    /// Mesh elevation settings
    pub mesh: MeshSettings,
    /// Color bands, ascending by height
    pub regions: Vec<Region>,
    /// Observer travel (world units) before the visible set is rebuilt;
    /// zero rebuilds every tick
    pub viewer_move_threshold: f32,
    /// Generation threads (None = one per core)
    pub worker_threads: Option<usize>,
    /// Resubmissions allowed after a failed request
    pub max_generation_retries: u32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            chunk_resolution: DEFAULT_CHUNK_RESOLUTION,
            detail_levels: vec![
                DetailLevel::new(0, 150.0),
                DetailLevel::new(1, 300.0),
                DetailLevel::new(2, 450.0),
            ],
            noise: NoiseSettings::default(),
            mesh: MeshSettings::default(),
            regions: default_regions(),
            viewer_move_threshold: DEFAULT_VIEWER_MOVE_THRESHOLD,
            worker_threads: None,
            max_generation_retries: DEFAULT_MAX_GENERATION_RETRIES,
        }
    }
}

impl TerrainConfig {
    /// Chunk edge length in world units.
    #[must_use]
    pub fn chunk_size(&self) -> f32 {
        self.chunk_resolution.saturating_sub(1) as f32
    }

    /// Clamps tunables that have an obvious safe value.
    pub fn sanitize(&mut self) {
        self.noise.sanitize();
        if !self.viewer_move_threshold.is_finite() || self.viewer_move_threshold < 0.0 {
            self.viewer_move_threshold = 0.0;
        }
    }

    /// Rejects configurations streaming cannot run with.
    ///
    /// Returns the validated detail level list.
    pub fn validate(&self) -> Result<DetailLevels, ConfigError> {
        if self.chunk_resolution < 2 {
            return Err(ConfigError::InvalidResolution(self.chunk_resolution));
        }
        let levels = DetailLevels::new(self.detail_levels.clone())?;

        let edge = self.chunk_resolution - 1;
        for level in levels.as_slice() {
            let step = level
                .simplification_step()
                .ok_or(ConfigError::DetailLevelOutOfRange(level.lod))?;
            if edge % step != 0 {
                return Err(ConfigError::IncompatibleDetailLevel {
                    level: level.lod,
                    step,
                    edge,
                });
            }
        }

        self.mesh.height_curve.validate()?;

        if self.worker_threads == Some(0) {
            return Err(ConfigError::NoWorkers);
        }

        if self.regions.windows(2).any(|w| w[1].height < w[0].height) {
            warn!("Color regions are not ascending by height; classification uses the first match");
        }

        Ok(levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = TerrainConfig::default();
        let levels = config.validate().expect("default is valid");
        assert_eq!(config.chunk_size(), 240.0);
        assert_eq!(levels.max_view_distance(), 450.0);
    }

    #[test]
    fn test_small_resolution_rejected() {
        let config = TerrainConfig {
            chunk_resolution: 1,
            ..TerrainConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidResolution(1)));
    }

    #[test]
    fn test_empty_detail_levels_rejected() {
        let config = TerrainConfig {
            detail_levels: Vec::new(),
            ..TerrainConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyDetailLevels));
    }

    #[test]
    fn test_incompatible_detail_level_rejected() {
        let config = TerrainConfig {
            chunk_resolution: 242,
            ..TerrainConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IncompatibleDetailLevel { level: 1, step: 2, edge: 241 })
        ));
    }

    #[test]
    fn test_huge_detail_level_rejected() {
        let config = TerrainConfig {
            detail_levels: vec![DetailLevel::new(0, 150.0), DetailLevel::new(1 << 31, 300.0)],
            ..TerrainConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::DetailLevelOutOfRange(1 << 31)));
    }

    #[test]
    fn test_step_wider_than_chunk_rejected() {
        let config = TerrainConfig {
            chunk_resolution: 9,
            detail_levels: vec![DetailLevel::new(0, 150.0), DetailLevel::new(8, 300.0)],
            ..TerrainConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IncompatibleDetailLevel { level: 8, step: 16, edge: 8 })
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = TerrainConfig {
            worker_threads: Some(0),
            ..TerrainConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoWorkers));
    }

    #[test]
    fn test_sanitize() {
        let mut config = TerrainConfig {
            viewer_move_threshold: -5.0,
            ..TerrainConfig::default()
        };
        config.noise.lacunarity = 0.2;
        config.sanitize();
        assert_eq!(config.viewer_move_threshold, 0.0);
        assert_eq!(config.noise.lacunarity, 1.0);
    }
}
