//! # Horizon World
//!
//! Endless terrain streaming for Project Horizon.
//!
//! This crate handles:
//! - Fractal-noise height fields and color classification
//! - Grid meshes at several levels of detail
//! - Background generation on a bounded worker pool
//! - Completion queues drained on the owning thread
//! - Per-chunk LOD state machine and the observer-driven streaming loop

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod chunk;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod generation;
pub mod height_field;
pub mod lod;
pub mod mesh;
pub mod presenter;
pub mod streaming;
pub mod worker;

#[cfg(test)]
mod testing;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::chunk::*;
    pub use crate::classify::*;
    pub use crate::config::*;
    pub use crate::dispatch::*;
    pub use crate::generation::*;
    pub use crate::height_field::*;
    pub use crate::lod::*;
    pub use crate::mesh::*;
    pub use crate::presenter::*;
    pub use crate::streaming::*;
    pub use crate::worker::*;
}

pub use prelude::*;
