//! Generation collaborators and the service that runs them off-thread.

use std::sync::Arc;

use glam::Vec2;
use horizon_common::{ChunkCoord, GenerationError, HorizonResult, RequestId};
use tracing::debug;

use crate::classify::{ColorField, Region};
use crate::config::TerrainConfig;
use crate::dispatch::{Completion, CompletionQueues, MeshReady, TerrainDataReady};
use crate::height_field::{generate_height_field, HeightField, NoiseSettings};
use crate::mesh::{build_mesh, MeshData, MeshSettings};
use crate::worker::{default_worker_count, GenerationWorkerPool};

/// Elevation and classified colors for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainData {
    /// Elevation samples
    pub heights: HeightField,
    /// Per-sample colors
    pub colors: ColorField,
}

/// Produces chunk data and meshes. Called from worker threads.
pub trait TerrainGenerator: Send + Sync {
    /// Generates the data for the chunk centered on `center`.
    fn generate_terrain(&self, center: Vec2) -> Result<TerrainData, GenerationError>;

    /// Builds the mesh of `heights` at detail level `lod`.
    fn build_mesh(&self, heights: &HeightField, lod: u32) -> Result<MeshData, GenerationError>;
}

/// Fractal-noise terrain with threshold coloring and grid meshes.
#[derive(Debug, Clone)]
pub struct NoiseTerrainGenerator {
    resolution: usize,
    noise: NoiseSettings,
    regions: Arc<[Region]>,
    mesh: MeshSettings,
}

impl NoiseTerrainGenerator {
    /// Creates a generator.
    #[must_use]
    pub fn new(resolution: usize, noise: NoiseSettings, regions: Vec<Region>, mesh: MeshSettings) -> Self {
        Self {
            resolution,
            noise,
            regions: regions.into(),
            mesh,
        }
    }

    /// Creates a generator from terrain configuration.
    #[must_use]
    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::new(
            config.chunk_resolution as usize,
            config.noise.clone(),
            config.regions.clone(),
            config.mesh.clone(),
        )
    }
}

impl TerrainGenerator for NoiseTerrainGenerator {
    fn generate_terrain(&self, center: Vec2) -> Result<TerrainData, GenerationError> {
        let heights = generate_height_field(self.resolution, &self.noise, center);
        let colors = ColorField::classify(&heights, &self.regions);
        Ok(TerrainData { heights, colors })
    }

    fn build_mesh(&self, heights: &HeightField, lod: u32) -> Result<MeshData, GenerationError> {
        build_mesh(heights, self.mesh.height_multiplier, &self.mesh.height_curve, lod)
    }
}

/// Request side of the generation pipeline, as seen by chunks.
///
/// Requests are fire-and-forget; their results come back through
/// [`drain_completions`](Self::drain_completions) on the owning thread.
pub trait GenerationRequests {
    /// Requests terrain data for the chunk at `coord`, centered on `center`.
    fn request_terrain_data(&mut self, coord: ChunkCoord, center: Vec2) -> RequestId;

    /// Requests the mesh for entry `lod_index` (mesh level `lod`) of a chunk.
    fn request_mesh(&mut self, coord: ChunkCoord, lod_index: usize, lod: u32, heights: HeightField) -> RequestId;

    /// Hands every completion that arrived before this call to `handler`.
    fn drain_completions(&mut self, handler: &mut dyn FnMut(Completion)) -> usize;

    /// Requests submitted whose completion has not been drained yet.
    fn pending(&self) -> usize;
}

/// Runs a [`TerrainGenerator`] on a worker pool and queues the results.
pub struct GenerationService {
    pool: GenerationWorkerPool,
    generator: Arc<dyn TerrainGenerator>,
    queues: CompletionQueues,
}

impl GenerationService {
    /// Creates a service over an existing pool.
    #[must_use]
    pub fn new(pool: GenerationWorkerPool, generator: Arc<dyn TerrainGenerator>) -> Self {
        Self {
            pool,
            generator,
            queues: CompletionQueues::new(),
        }
    }

    /// Creates a service with a noise generator and pool sized from `config`.
    pub fn from_config(config: &TerrainConfig) -> HorizonResult<Self> {
        let threads = config.worker_threads.unwrap_or_else(default_worker_count);
        let pool = GenerationWorkerPool::new(threads)?;
        Ok(Self::new(pool, Arc::new(NoiseTerrainGenerator::from_config(config))))
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &GenerationWorkerPool {
        &self.pool
    }

    /// The completion queues.
    #[must_use]
    pub fn queues(&self) -> &CompletionQueues {
        &self.queues
    }
}

impl GenerationRequests for GenerationService {
    fn request_terrain_data(&mut self, coord: ChunkCoord, center: Vec2) -> RequestId {
        let request = RequestId::new();
        let generator = Arc::clone(&self.generator);
        let sender = self.queues.terrain.sender();

        debug!("Requesting terrain data {request} for chunk {coord}");
        self.pool.submit(
            move || generator.generate_terrain(center),
            move |result| {
                sender.enqueue(TerrainDataReady { request, coord, result });
            },
        );
        request
    }

    fn request_mesh(&mut self, coord: ChunkCoord, lod_index: usize, lod: u32, heights: HeightField) -> RequestId {
        let request = RequestId::new();
        let generator = Arc::clone(&self.generator);
        let sender = self.queues.meshes.sender();

        debug!("Requesting mesh {request} for chunk {coord} at lod {lod}");
        self.pool.submit(
            move || generator.build_mesh(&heights, lod).map(Arc::new),
            move |result| {
                sender.enqueue(MeshReady {
                    request,
                    coord,
                    lod_index,
                    result,
                });
            },
        );
        request
    }

    fn drain_completions(&mut self, handler: &mut dyn FnMut(Completion)) -> usize {
        self.queues.drain_and_dispatch(handler)
    }

    fn pending(&self) -> usize {
        self.pool.in_flight() + self.queues.len()
    }
}

impl std::fmt::Debug for GenerationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationService")
            .field("pool", &self.pool)
            .field("queued", &self.queues.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::default_regions;
    use std::time::{Duration, Instant};

    fn small_generator() -> NoiseTerrainGenerator {
        NoiseTerrainGenerator::new(25, NoiseSettings::default(), default_regions(), MeshSettings::default())
    }

    #[test]
    fn test_generator_produces_matching_fields() {
        let data = small_generator()
            .generate_terrain(Vec2::new(24.0, 48.0))
            .expect("terrain");
        assert_eq!(data.heights.width(), 25);
        assert_eq!(data.colors.width(), 25);
        assert_eq!(data.colors.colors().len(), 25 * 25);
    }

    #[test]
    fn test_generator_builds_mesh_per_lod() {
        let generator = small_generator();
        let data = generator.generate_terrain(Vec2::ZERO).expect("terrain");
        let mesh = generator.build_mesh(&data.heights, 1).expect("mesh");
        assert_eq!(mesh.lod, 1);
        assert_eq!(mesh.vertex_count(), 13 * 13);
    }

    #[test]
    fn test_service_delivers_tagged_completions() {
        let pool = GenerationWorkerPool::new(2).expect("pool");
        let mut service = GenerationService::new(pool, Arc::new(small_generator()));
        let coord = ChunkCoord::new(2, -1);

        let request = service.request_terrain_data(coord, coord.center(24.0));

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut received = Vec::new();
        while received.is_empty() && Instant::now() < deadline {
            service.drain_completions(&mut |completion: Completion| received.push(completion));
            std::thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(received.len(), 1);
        match received.remove(0) {
            Completion::TerrainData(ready) => {
                assert_eq!(ready.request, request);
                assert_eq!(ready.coord, coord);
                assert!(ready.result.is_ok());
            },
            Completion::Mesh(_) => panic!("expected terrain data"),
        }
        while service.pending() > 0 && Instant::now() < deadline {
            std::thread::yield_now();
        }
        assert_eq!(service.pending(), 0);
    }
}
