//! Coordinate types for the chunk grid and the world plane.
//!
//! The terrain lies on the world XZ plane. Positions on that plane are
//! carried as [`Vec2`] where `x` is world X and `y` is world Z.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space (world Z)
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the chunk whose center is nearest to `position`.
    ///
    /// Chunks are centered on multiples of `chunk_size`, so this rounds to
    /// nearest on both axes rather than flooring.
    #[must_use]
    pub fn nearest(position: Vec2, chunk_size: f32) -> Self {
        Self {
            x: (position.x / chunk_size).round() as i32,
            y: (position.y / chunk_size).round() as i32,
        }
    }

    /// Returns this coordinate shifted by `(dx, dy)` chunks, clamped to the
    /// `i32` range.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// World-plane center of the chunk.
    #[must_use]
    pub fn center(self, chunk_size: f32) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32) * chunk_size
    }

    /// World-plane bounds of the chunk.
    #[must_use]
    pub fn bounds(self, chunk_size: f32) -> Bounds {
        Bounds::new(self.center(chunk_size), chunk_size)
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned square on the world plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Center point
    pub center: Vec2,
    /// Half the side length
    pub half_extent: f32,
}

impl Bounds {
    /// Creates bounds centered on `center` with side length `size`.
    #[must_use]
    pub fn new(center: Vec2, size: f32) -> Self {
        Self {
            center,
            half_extent: size * 0.5,
        }
    }

    /// Minimum corner.
    #[must_use]
    pub fn min(&self) -> Vec2 {
        self.center - Vec2::splat(self.half_extent)
    }

    /// Maximum corner.
    #[must_use]
    pub fn max(&self) -> Vec2 {
        self.center + Vec2::splat(self.half_extent)
    }

    /// Returns true if `point` lies inside or on the edge.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        let d = (point - self.center).abs();
        d.x <= self.half_extent && d.y <= self.half_extent
    }

    /// Closest point of the bounds to `point`.
    #[must_use]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min(), self.max())
    }

    /// Squared distance from `point` to the nearest edge (zero inside).
    #[must_use]
    pub fn sqr_distance(&self, point: Vec2) -> f32 {
        self.closest_point(point).distance_squared(point)
    }

    /// Distance from `point` to the nearest edge (zero inside).
    #[must_use]
    pub fn distance(&self, point: Vec2) -> f32 {
        self.sqr_distance(point).sqrt()
    }
}
