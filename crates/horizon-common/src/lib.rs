//! # Horizon Common
//!
//! Common types, utilities, and shared abstractions for Project Horizon.
//!
//! This crate provides foundational types used across all Horizon subsystems:
//! - Coordinate and bounds types (chunk grid, world plane)
//! - Request IDs for correlating generation work
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_chunk_coord_round_trip_through_world() {
        let coord = ChunkCoord::new(3, -2);
        let center = coord.center(240.0);
        assert_eq!(ChunkCoord::nearest(center, 240.0), coord);
    }

    #[test]
    fn test_request_id_generation() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_error_conversion() {
        let err: HorizonError = ConfigError::EmptyDetailLevels.into();
        assert!(matches!(err, HorizonError::Config(_)));
        let bounds = Bounds::new(Vec2::ZERO, 10.0);
        assert!(bounds.contains(Vec2::new(5.0, -5.0)));
    }
}
