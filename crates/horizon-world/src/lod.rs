//! Detail level thresholds and selection.

use horizon_common::ConfigError;
use serde::{Deserialize, Serialize};

/// One entry of the detail level list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetailLevel {
    /// Mesh detail level (0 = full resolution)
    pub lod: u32,
    /// Edge distance up to which this level is used
    pub visible_distance_threshold: f32,
}

impl DetailLevel {
    /// Creates a detail level entry.
    #[must_use]
    pub const fn new(lod: u32, visible_distance_threshold: f32) -> Self {
        Self {
            lod,
            visible_distance_threshold,
        }
    }

    /// Vertex step used when meshing at this level, or `None` if it does
    /// not fit in a `u32`.
    #[must_use]
    pub const fn simplification_step(&self) -> Option<u32> {
        simplification_step(self.lod)
    }
}

/// Vertex step for a mesh detail level: every vertex at level 0, every
/// `2 * lod`-th vertex otherwise. `None` when the step overflows.
#[must_use]
pub const fn simplification_step(lod: u32) -> Option<u32> {
    if lod == 0 {
        Some(1)
    } else {
        lod.checked_mul(2)
    }
}

/// Validated detail level list, ascending by threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailLevels {
    levels: Vec<DetailLevel>,
}

impl DetailLevels {
    /// Validates and wraps a detail level list.
    pub fn new(levels: Vec<DetailLevel>) -> Result<Self, ConfigError> {
        if levels.is_empty() {
            return Err(ConfigError::EmptyDetailLevels);
        }
        for (index, level) in levels.iter().enumerate() {
            let threshold = level.visible_distance_threshold;
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(ConfigError::InvalidThreshold { index, threshold });
            }
        }
        for (index, pair) in levels.windows(2).enumerate() {
            if pair[1].visible_distance_threshold < pair[0].visible_distance_threshold {
                return Err(ConfigError::UnsortedDetailLevels {
                    index: index + 1,
                    threshold: pair[1].visible_distance_threshold,
                    previous: pair[0].visible_distance_threshold,
                });
            }
        }
        Ok(Self { levels })
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Entry at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DetailLevel> {
        self.levels.get(index)
    }

    /// All entries.
    #[must_use]
    pub fn as_slice(&self) -> &[DetailLevel] {
        &self.levels
    }

    /// Maximum view distance: the last entry's threshold.
    #[must_use]
    pub fn max_view_distance(&self) -> f32 {
        self.levels
            .last()
            .map_or(0.0, |level| level.visible_distance_threshold)
    }

    /// Selects the entry index for an edge distance.
    ///
    /// Walks the thresholds in order and stops at the first one not
    /// exceeded, so a distance exactly on a threshold keeps the finer level.
    /// The last entry only bounds visibility and is never compared here.
    #[must_use]
    pub fn select(&self, distance: f32) -> usize {
        let mut index = 0;
        for (i, level) in self.levels.iter().take(self.levels.len() - 1).enumerate() {
            if distance > level.visible_distance_threshold {
                index = i + 1;
            } else {
                break;
            }
        }
        index
    }
}
