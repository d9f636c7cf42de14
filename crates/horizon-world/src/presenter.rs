//! Render-side sink for chunk state changes.

use std::sync::Arc;

use glam::Vec3;
use horizon_common::ChunkCoord;

use crate::generation::TerrainData;
use crate::mesh::MeshData;

/// Receives every change the streaming core makes to a chunk's renderable.
///
/// All calls happen on the owning thread, so implementations may hold
/// thread-bound render resources.
pub trait TerrainPresenter {
    /// A chunk object was created at `position`, initially hidden.
    fn chunk_created(&mut self, coord: ChunkCoord, position: Vec3) {
        let _ = (coord, position);
    }

    /// Terrain data arrived (colors can be baked into a texture here).
    fn chunk_data_ready(&mut self, coord: ChunkCoord, data: &TerrainData) {
        let _ = (coord, data);
    }

    /// Visibility changed.
    fn set_visible(&mut self, coord: ChunkCoord, visible: bool);

    /// The displayed mesh was swapped to detail entry `lod_index`.
    fn set_mesh(&mut self, coord: ChunkCoord, lod_index: usize, mesh: &Arc<MeshData>);
}

/// Presenter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl TerrainPresenter for NullPresenter {
    fn set_visible(&mut self, _coord: ChunkCoord, _visible: bool) {}

    fn set_mesh(&mut self, _coord: ChunkCoord, _lod_index: usize, _mesh: &Arc<MeshData>) {}
}
