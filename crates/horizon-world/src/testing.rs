//! Recording fakes for chunk and streaming tests.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use horizon_common::{ChunkCoord, GenerationError, RequestId};

use crate::classify::{default_regions, ColorField};
use crate::dispatch::{Completion, MeshReady, TerrainDataReady};
use crate::generation::{GenerationRequests, TerrainData};
use crate::height_field::HeightField;
use crate::mesh::MeshData;
use crate::presenter::TerrainPresenter;

pub(crate) fn flat_terrain() -> TerrainData {
    let heights = HeightField::flat(5, 5, 0.5);
    let colors = ColorField::classify(&heights, &default_regions());
    TerrainData { heights, colors }
}

pub(crate) fn mesh_for(lod: u32) -> Arc<MeshData> {
    Arc::new(MeshData {
        lod,
        vertices: Vec::new(),
        indices: Vec::new(),
    })
}

fn injected<T>() -> Result<T, GenerationError> {
    Err(GenerationError::Failed("injected".into()))
}

/// Records requests; completions are produced only when a test asks.
#[derive(Debug, Default)]
pub(crate) struct RecordingRequests {
    pub terrain: Vec<(ChunkCoord, Vec2)>,
    pub meshes: Vec<(ChunkCoord, usize, u32)>,
    open_terrain: Vec<(RequestId, ChunkCoord)>,
    open_meshes: Vec<(RequestId, ChunkCoord, usize, u32)>,
    ready: Vec<Completion>,
}

impl RecordingRequests {
    pub fn terrain_requests(&self, coord: ChunkCoord) -> usize {
        self.terrain.iter().filter(|(c, _)| *c == coord).count()
    }

    pub fn mesh_requests(&self, coord: ChunkCoord, lod_index: usize) -> usize {
        self.meshes
            .iter()
            .filter(|(c, i, _)| *c == coord && *i == lod_index)
            .count()
    }

    /// Completes every open request successfully.
    pub fn resolve_all(&mut self) {
        for (request, coord) in self.open_terrain.drain(..) {
            self.ready.push(Completion::TerrainData(TerrainDataReady {
                request,
                coord,
                result: Ok(flat_terrain()),
            }));
        }
        for (request, coord, lod_index, lod) in self.open_meshes.drain(..) {
            self.ready.push(Completion::Mesh(MeshReady {
                request,
                coord,
                lod_index,
                result: Ok(mesh_for(lod)),
            }));
        }
    }

    /// Fails every open request.
    pub fn fail_all(&mut self) {
        for (request, coord) in self.open_terrain.drain(..) {
            self.ready.push(Completion::TerrainData(TerrainDataReady {
                request,
                coord,
                result: injected(),
            }));
        }
        for (request, coord, lod_index, _) in self.open_meshes.drain(..) {
            self.ready.push(Completion::Mesh(MeshReady {
                request,
                coord,
                lod_index,
                result: injected(),
            }));
        }
    }
}

impl GenerationRequests for RecordingRequests {
    fn request_terrain_data(&mut self, coord: ChunkCoord, center: Vec2) -> RequestId {
        let request = RequestId::new();
        self.terrain.push((coord, center));
        self.open_terrain.push((request, coord));
        request
    }

    fn request_mesh(&mut self, coord: ChunkCoord, lod_index: usize, lod: u32, _heights: HeightField) -> RequestId {
        let request = RequestId::new();
        self.meshes.push((coord, lod_index, lod));
        self.open_meshes.push((request, coord, lod_index, lod));
        request
    }

    fn drain_completions(&mut self, handler: &mut dyn FnMut(Completion)) -> usize {
        let ready = std::mem::take(&mut self.ready);
        let count = ready.len();
        for completion in ready {
            handler(completion);
        }
        count
    }

    fn pending(&self) -> usize {
        self.open_terrain.len() + self.open_meshes.len() + self.ready.len()
    }
}

/// Records every presenter call.
#[derive(Debug, Default)]
pub(crate) struct RecordingPresenter {
    pub created: Vec<ChunkCoord>,
    pub positions: Vec<Vec3>,
    pub data_ready: Vec<ChunkCoord>,
    pub visibility: Vec<(ChunkCoord, bool)>,
    pub meshes: Vec<(ChunkCoord, usize)>,
}

impl TerrainPresenter for RecordingPresenter {
    fn chunk_created(&mut self, coord: ChunkCoord, position: Vec3) {
        self.created.push(coord);
        self.positions.push(position);
    }

    fn chunk_data_ready(&mut self, coord: ChunkCoord, _data: &TerrainData) {
        self.data_ready.push(coord);
    }

    fn set_visible(&mut self, coord: ChunkCoord, visible: bool) {
        self.visibility.push((coord, visible));
    }

    fn set_mesh(&mut self, coord: ChunkCoord, lod_index: usize, _mesh: &Arc<MeshData>) {
        self.meshes.push((coord, lod_index));
    }
}
