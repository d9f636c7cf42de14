//! Observer-driven chunk streaming.
//!
//! The [`StreamingController`] owns every chunk. Each [`tick`] it drains
//! finished generation work, then rebuilds the visible window around the
//! observer once it has moved far enough.
//!
//! [`tick`]: StreamingController::tick

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use glam::Vec2;
use horizon_common::{ChunkCoord, ConfigError};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::chunk::{ChunkState, LodState, TerrainChunk, UpdateContext};
use crate::config::TerrainConfig;
use crate::dispatch::Completion;
use crate::generation::GenerationRequests;
use crate::lod::DetailLevels;
use crate::presenter::TerrainPresenter;

/// Supplies the observer position once per tick.
pub trait ObserverSource {
    /// Current observer position on the world plane.
    fn position(&self) -> Vec2;
}

impl<F> ObserverSource for F
where
    F: Fn() -> Vec2,
{
    fn position(&self) -> Vec2 {
        self()
    }
}

/// Observer position shared between a controller and whoever moves it.
#[derive(Debug, Clone, Default)]
pub struct SharedObserver(Arc<RwLock<Vec2>>);

impl SharedObserver {
    /// Creates a handle at `position`.
    #[must_use]
    pub fn new(position: Vec2) -> Self {
        Self(Arc::new(RwLock::new(position)))
    }

    /// Moves the observer.
    pub fn set(&self, position: Vec2) {
        *self.0.write() = position;
    }

    /// Current position.
    #[must_use]
    pub fn get(&self) -> Vec2 {
        *self.0.read()
    }
}

impl ObserverSource for SharedObserver {
    fn position(&self) -> Vec2 {
        self.get()
    }
}

/// Every chunk ever created, by coordinate. Nothing is evicted.
#[derive(Debug)]
pub struct ChunkRegistry {
    chunk_size: f32,
    chunks: AHashMap<ChunkCoord, TerrainChunk>,
}

impl ChunkRegistry {
    /// Creates an empty registry for chunks of `chunk_size` world units.
    #[must_use]
    pub fn new(chunk_size: f32) -> Self {
        Self {
            chunk_size,
            chunks: AHashMap::new(),
        }
    }

    /// Returns the chunk at `coord`, creating it on first access.
    pub fn get_or_create(&mut self, coord: ChunkCoord, ctx: &mut UpdateContext<'_>) -> &mut TerrainChunk {
        let chunk_size = self.chunk_size;
        self.chunks.entry(coord).or_insert_with(|| {
            debug!("Creating chunk {coord}");
            TerrainChunk::new(coord, chunk_size, ctx)
        })
    }

    /// Chunk at `coord`, if created.
    #[must_use]
    pub fn get(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    /// Mutable chunk at `coord`, if created.
    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut TerrainChunk> {
        self.chunks.get_mut(&coord)
    }

    /// Number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if no chunk was created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterates over all chunks in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.values()
    }

    /// Chunk edge length in world units.
    #[must_use]
    pub const fn chunk_size(&self) -> f32 {
        self.chunk_size
    }
}

/// Snapshot of streaming progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingStats {
    /// Chunks created so far
    pub chunks: usize,
    /// Chunks currently shown
    pub visible: usize,
    /// Chunks still waiting for terrain data
    pub awaiting_data: usize,
    /// Chunks whose terrain data failed
    pub failed_chunks: usize,
    /// Mesh requests outstanding
    pub pending_meshes: usize,
    /// Meshes cached
    pub ready_meshes: usize,
    /// Mesh slots whose last request failed
    pub failed_meshes: usize,
}

/// What one [`StreamingController::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Completions routed to chunks
    pub completions: usize,
    /// Whether the visible window was rebuilt
    pub rebuilt: bool,
    /// Chunks re-updated because a completion reached them
    pub refreshed: usize,
}

/// Drives chunk creation, visibility and detail from the observer position.
pub struct StreamingController<R, P> {
    levels: DetailLevels,
    chunk_size: f32,
    visible_radius: i32,
    move_threshold: f32,
    max_retries: u32,
    registry: ChunkRegistry,
    requests: R,
    presenter: P,
    observer: Box<dyn ObserverSource>,
    last_update_position: Option<Vec2>,
    last_window: Vec<ChunkCoord>,
    visible_last_update: Vec<ChunkCoord>,
    visible_set: AHashSet<ChunkCoord>,
}

impl<R, P> StreamingController<R, P>
where
    R: GenerationRequests,
    P: TerrainPresenter,
{
    /// Creates a controller. Fails if `config` does not validate.
    pub fn new(
        config: &TerrainConfig,
        requests: R,
        presenter: P,
        observer: impl ObserverSource + 'static,
    ) -> Result<Self, ConfigError> {
        let levels = config.validate()?;
        let chunk_size = config.chunk_size();
        let visible_radius = (levels.max_view_distance() / chunk_size).ceil() as i32;

        info!(
            "Terrain streaming: chunk size {chunk_size}, view distance {}, radius {visible_radius}",
            levels.max_view_distance()
        );

        Ok(Self {
            levels,
            chunk_size,
            visible_radius,
            move_threshold: config.viewer_move_threshold.max(0.0),
            max_retries: config.max_generation_retries,
            registry: ChunkRegistry::new(chunk_size),
            requests,
            presenter,
            observer: Box::new(observer),
            last_update_position: None,
            last_window: Vec::new(),
            visible_last_update: Vec::new(),
            visible_set: AHashSet::new(),
        })
    }

    /// Runs one frame: drain completions, then update visibility.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        let touched = self.apply_completions(&mut report);

        let position = self.observer.position();
        let moved = match self.last_update_position {
            None => true,
            Some(last) => {
                self.move_threshold <= 0.0
                    || last.distance_squared(position) > self.move_threshold * self.move_threshold
            },
        };

        if moved {
            self.update_visible_chunks(position);
            report.rebuilt = true;
        } else {
            report.refreshed = self.refresh(&touched, position);
        }

        report
    }

    fn apply_completions(&mut self, report: &mut TickReport) -> Vec<ChunkCoord> {
        let mut arrived = Vec::new();
        report.completions = self.requests.drain_completions(&mut |completion: Completion| arrived.push(completion));

        let mut seen = AHashSet::new();
        let mut touched = Vec::new();
        for completion in arrived {
            let coord = completion.coord();
            let Some(chunk) = self.registry.get_mut(coord) else {
                warn!("Completion for unknown chunk {coord}");
                continue;
            };
            match completion {
                Completion::TerrainData(ready) => {
                    debug!("Terrain data {} arrived for chunk {coord}", ready.request);
                    chunk.on_terrain_data(ready.result, self.max_retries, &mut self.presenter);
                },
                Completion::Mesh(ready) => {
                    debug!("Mesh {} arrived for chunk {coord}", ready.request);
                    chunk.on_mesh(ready.lod_index, ready.result, self.max_retries);
                },
            }
            if seen.insert(coord) {
                touched.push(coord);
            }
        }
        touched
    }

    fn refresh(&mut self, touched: &[ChunkCoord], position: Vec2) -> usize {
        let mut ctx = UpdateContext {
            levels: &self.levels,
            requests: &mut self.requests,
            presenter: &mut self.presenter,
            max_retries: self.max_retries,
        };

        let mut refreshed = 0;
        for coord in touched {
            if !self.visible_set.contains(coord) {
                continue;
            }
            let Some(chunk) = self.registry.get_mut(*coord) else {
                continue;
            };
            refreshed += 1;
            if !chunk.update(position, &mut ctx) {
                self.visible_set.remove(coord);
                self.visible_last_update.retain(|c| c != coord);
            }
        }
        refreshed
    }

    /// Rebuilds the visible window around `position`.
    pub fn update_visible_chunks(&mut self, position: Vec2) {
        let current = ChunkCoord::nearest(position, self.chunk_size);
        let radius = self.visible_radius;
        let side = (2 * radius).max(0) as usize;

        let mut ctx = UpdateContext {
            levels: &self.levels,
            requests: &mut self.requests,
            presenter: &mut self.presenter,
            max_retries: self.max_retries,
        };

        let mut window = Vec::with_capacity(side * side);
        let mut visible = Vec::with_capacity(side * side);
        let mut visible_set = AHashSet::with_capacity(side * side);
        for dy in -radius..radius {
            for dx in -radius..radius {
                let coord = current.offset(dx, dy);
                window.push(coord);
                let chunk = self.registry.get_or_create(coord, &mut ctx);
                if chunk.update(position, &mut ctx) {
                    visible.push(coord);
                    visible_set.insert(coord);
                }
            }
        }

        for coord in &self.visible_last_update {
            if visible_set.contains(coord) {
                continue;
            }
            if let Some(chunk) = self.registry.get_mut(*coord) {
                chunk.set_visible(false, ctx.presenter);
            }
        }

        debug!(
            "Visible window around chunk {current}: {} of {} chunks visible",
            visible.len(),
            window.len()
        );

        self.last_window = window;
        self.visible_last_update = visible;
        self.visible_set = visible_set;
        self.last_update_position = Some(position);
    }

    /// Current progress counters.
    #[must_use]
    pub fn stats(&self) -> StreamingStats {
        let mut stats = StreamingStats {
            chunks: self.registry.len(),
            ..StreamingStats::default()
        };
        for chunk in self.registry.iter() {
            if chunk.is_visible() {
                stats.visible += 1;
            }
            match chunk.state() {
                ChunkState::AwaitingHeightField => stats.awaiting_data += 1,
                ChunkState::Failed => stats.failed_chunks += 1,
                ChunkState::Idle => {},
            }
            let lods = chunk.lods();
            stats.pending_meshes += lods.count(|s| matches!(s, LodState::Pending));
            stats.ready_meshes += lods.count(|s| matches!(s, LodState::Ready(_)));
            stats.failed_meshes += lods.count(|s| matches!(s, LodState::Failed));
        }
        stats
    }

    /// Chunk registry.
    #[must_use]
    pub const fn registry(&self) -> &ChunkRegistry {
        &self.registry
    }

    /// Detail levels in use.
    #[must_use]
    pub const fn levels(&self) -> &DetailLevels {
        &self.levels
    }

    /// Chunks around the observer span `[-radius, radius)` on each axis.
    #[must_use]
    pub const fn visible_radius(&self) -> i32 {
        self.visible_radius
    }

    /// Chunk edge length in world units.
    #[must_use]
    pub const fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    /// Coordinates updated by the last window rebuild, in visit order.
    #[must_use]
    pub fn last_window(&self) -> &[ChunkCoord] {
        &self.last_window
    }

    /// Chunks visible after the last update.
    #[must_use]
    pub fn visible_chunks(&self) -> &[ChunkCoord] {
        &self.visible_last_update
    }

    /// Observer position at the last window rebuild.
    #[must_use]
    pub const fn last_update_position(&self) -> Option<Vec2> {
        self.last_update_position
    }

    /// Generation backend.
    #[must_use]
    pub const fn requests(&self) -> &R {
        &self.requests
    }

    /// Mutable generation backend.
    pub fn requests_mut(&mut self) -> &mut R {
        &mut self.requests
    }

    /// Presenter.
    #[must_use]
    pub const fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Mutable presenter.
    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }
}

impl<R, P> std::fmt::Debug for StreamingController<R, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingController")
            .field("chunk_size", &self.chunk_size)
            .field("visible_radius", &self.visible_radius)
            .field("chunks", &self.registry.len())
            .field("visible", &self.visible_last_update.len())
            .finish_non_exhaustive()
    }
}
