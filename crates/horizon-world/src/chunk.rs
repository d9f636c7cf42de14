//! Terrain chunks and their per-detail-level mesh cache.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use horizon_common::{Bounds, ChunkCoord, GenerationError};
use tracing::{debug, trace, warn};

use crate::generation::{GenerationRequests, TerrainData};
use crate::lod::DetailLevels;
use crate::mesh::MeshData;
use crate::presenter::TerrainPresenter;

/// Where a chunk is in its data lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Terrain data requested, not yet arrived
    AwaitingHeightField,
    /// Terrain data present
    Idle,
    /// Last terrain data request failed
    Failed,
}

/// Mesh cache slot state for one detail level.
#[derive(Debug, Clone, PartialEq)]
pub enum LodState {
    /// No mesh requested yet
    NotRequested,
    /// Mesh requested, result outstanding
    Pending,
    /// Mesh cached
    Ready(Arc<MeshData>),
    /// Last request for this level failed
    Failed,
}

#[derive(Debug, Clone)]
struct LodSlot {
    state: LodState,
    failures: u32,
}

/// Per-detail-level mesh slots of one chunk.
///
/// A slot moves `NotRequested -> Pending -> Ready`; `Pending` can also fall
/// to `Failed`, from which it may be requested again. `Ready` is final.
#[derive(Debug, Clone)]
pub struct LodCache {
    slots: Vec<LodSlot>,
}

impl LodCache {
    /// Creates `count` empty slots.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![
                LodSlot {
                    state: LodState::NotRequested,
                    failures: 0,
                };
                count
            ],
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if there are no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// State of slot `index`.
    #[must_use]
    pub fn state(&self, index: usize) -> Option<&LodState> {
        self.slots.get(index).map(|slot| &slot.state)
    }

    /// Cached mesh of slot `index`.
    #[must_use]
    pub fn mesh(&self, index: usize) -> Option<&Arc<MeshData>> {
        match self.state(index) {
            Some(LodState::Ready(mesh)) => Some(mesh),
            _ => None,
        }
    }

    /// Failed attempts recorded for slot `index`.
    #[must_use]
    pub fn failures(&self, index: usize) -> u32 {
        self.slots.get(index).map_or(0, |slot| slot.failures)
    }

    /// Moves slot `index` to `Pending` if a request may be issued for it.
    ///
    /// Allowed from `NotRequested`, and from `Failed` while the slot has
    /// failed no more than `max_retries` times.
    pub fn begin_request(&mut self, index: usize, max_retries: u32) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        let allowed = match slot.state {
            LodState::NotRequested => true,
            LodState::Failed => slot.failures <= max_retries,
            LodState::Pending | LodState::Ready(_) => false,
        };
        if allowed {
            slot.state = LodState::Pending;
        }
        allowed
    }

    /// Stores an arrived mesh. Ignored unless the slot is `Pending`.
    pub fn store(&mut self, index: usize, mesh: Arc<MeshData>) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.state == LodState::Pending => {
                slot.state = LodState::Ready(mesh);
                true
            },
            _ => false,
        }
    }

    /// Records a failed request. Returns the slot's failure count.
    pub fn fail(&mut self, index: usize) -> u32 {
        match self.slots.get_mut(index) {
            Some(slot) if slot.state == LodState::Pending => {
                slot.state = LodState::Failed;
                slot.failures += 1;
                slot.failures
            },
            Some(slot) => slot.failures,
            None => 0,
        }
    }

    /// Number of slots matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&LodState) -> bool) -> usize {
        self.slots.iter().filter(|slot| predicate(&slot.state)).count()
    }
}

/// What a chunk needs from its owner while updating.
pub struct UpdateContext<'a> {
    /// Detail level list
    pub levels: &'a DetailLevels,
    /// Where generation requests go
    pub requests: &'a mut dyn GenerationRequests,
    /// Where render changes go
    pub presenter: &'a mut dyn TerrainPresenter,
    /// Resubmissions allowed after a failure
    pub max_retries: u32,
}

/// One streamed terrain cell.
#[derive(Debug)]
pub struct TerrainChunk {
    coord: ChunkCoord,
    bounds: Bounds,
    state: ChunkState,
    data: Option<TerrainData>,
    data_failures: u32,
    lods: LodCache,
    applied_lod: Option<usize>,
    visible: bool,
}

impl TerrainChunk {
    /// Creates a hidden chunk and requests its terrain data.
    pub fn new(coord: ChunkCoord, chunk_size: f32, ctx: &mut UpdateContext<'_>) -> Self {
        let bounds = coord.bounds(chunk_size);
        let center = bounds.center;

        ctx.presenter
            .chunk_created(coord, Vec3::new(center.x, 0.0, center.y));
        ctx.requests.request_terrain_data(coord, center);

        Self {
            coord,
            bounds,
            state: ChunkState::AwaitingHeightField,
            data: None,
            data_failures: 0,
            lods: LodCache::new(ctx.levels.len()),
            applied_lod: None,
            visible: false,
        }
    }

    /// Recomputes visibility and detail for an observer position.
    ///
    /// Returns whether the chunk is visible afterwards.
    pub fn update(&mut self, observer: Vec2, ctx: &mut UpdateContext<'_>) -> bool {
        let distance = self.bounds.distance(observer);
        let visible = distance <= ctx.levels.max_view_distance();

        if visible {
            match self.state {
                ChunkState::Idle => self.update_detail(distance, ctx),
                ChunkState::Failed if self.data_failures <= ctx.max_retries => {
                    debug!("Retrying terrain data for chunk {}", self.coord);
                    self.state = ChunkState::AwaitingHeightField;
                    ctx.requests.request_terrain_data(self.coord, self.bounds.center);
                },
                ChunkState::AwaitingHeightField | ChunkState::Failed => {},
            }
        }

        self.set_visible(visible, ctx.presenter);
        visible
    }

    fn update_detail(&mut self, distance: f32, ctx: &mut UpdateContext<'_>) {
        let lod_index = ctx.levels.select(distance);
        if self.applied_lod == Some(lod_index) {
            return;
        }

        if let Some(mesh) = self.lods.mesh(lod_index) {
            trace!("Chunk {} swapping to lod index {lod_index}", self.coord);
            ctx.presenter.set_mesh(self.coord, lod_index, mesh);
            self.applied_lod = Some(lod_index);
            return;
        }

        let (Some(data), Some(level)) = (&self.data, ctx.levels.get(lod_index)) else {
            return;
        };
        if self.lods.begin_request(lod_index, ctx.max_retries) {
            ctx.requests
                .request_mesh(self.coord, lod_index, level.lod, data.heights.clone());
        }
    }

    /// Shows or hides the chunk, notifying the presenter on change.
    pub fn set_visible(&mut self, visible: bool, presenter: &mut dyn TerrainPresenter) {
        if self.visible != visible {
            trace!("Chunk {} visible: {visible}", self.coord);
            self.visible = visible;
            presenter.set_visible(self.coord, visible);
        }
    }

    /// Consumes a terrain data completion.
    pub fn on_terrain_data(
        &mut self,
        result: Result<TerrainData, GenerationError>,
        max_retries: u32,
        presenter: &mut dyn TerrainPresenter,
    ) {
        if self.state != ChunkState::AwaitingHeightField {
            debug!("Ignoring unexpected terrain data for chunk {}", self.coord);
            return;
        }
        match result {
            Ok(data) => {
                presenter.chunk_data_ready(self.coord, &data);
                self.data = Some(data);
                self.state = ChunkState::Idle;
            },
            Err(err) => {
                self.data_failures += 1;
                self.state = ChunkState::Failed;
                if self.data_failures > max_retries {
                    warn!("Terrain data for chunk {} failed permanently: {err}", self.coord);
                } else {
                    warn!("Terrain data for chunk {} failed, will retry: {err}", self.coord);
                }
            },
        }
    }

    /// Consumes a mesh completion for detail entry `lod_index`.
    ///
    /// Never swaps the displayed mesh; a later [`update`](Self::update)
    /// applies it if that level is still selected.
    pub fn on_mesh(&mut self, lod_index: usize, result: Result<Arc<MeshData>, GenerationError>, max_retries: u32) {
        match result {
            Ok(mesh) => {
                if !self.lods.store(lod_index, mesh) {
                    debug!("Ignoring unexpected mesh for chunk {} lod index {lod_index}", self.coord);
                }
            },
            Err(err) => {
                let failures = self.lods.fail(lod_index);
                if failures > max_retries {
                    warn!(
                        "Mesh for chunk {} lod index {lod_index} failed permanently: {err}",
                        self.coord
                    );
                } else {
                    warn!("Mesh for chunk {} lod index {lod_index} failed, will retry: {err}", self.coord);
                }
            },
        }
    }

    /// Grid coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// World-plane bounds.
    #[must_use]
    pub const fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Data lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ChunkState {
        self.state
    }

    /// Terrain data, once arrived.
    #[must_use]
    pub const fn terrain_data(&self) -> Option<&TerrainData> {
        self.data.as_ref()
    }

    /// Mesh cache.
    #[must_use]
    pub const fn lods(&self) -> &LodCache {
        &self.lods
    }

    /// Detail entry whose mesh is displayed.
    #[must_use]
    pub const fn applied_lod(&self) -> Option<usize> {
        self.applied_lod
    }

    /// Current visibility flag.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }
}
