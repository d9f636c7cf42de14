//! Headless streaming loop.
//!
//! Walks an observer along the configured path and ticks terrain streaming
//! at a fixed rate, logging progress instead of rendering.

use std::sync::Arc;

use anyhow::Result;
use glam::{Vec2, Vec3};
use horizon_common::ChunkCoord;
use horizon_world::{
    GenerationRequests, GenerationService, MeshData, SharedObserver, StreamingController, TerrainData,
    TerrainPresenter,
};
use tracing::{debug, info, trace};

use crate::config::EngineConfig;
use crate::timing::TickTiming;

/// Presenter that logs render changes and tallies what would be uploaded.
#[derive(Debug, Default)]
pub struct LoggingPresenter {
    /// Chunk objects created
    pub created: usize,
    /// Meshes swapped in
    pub mesh_swaps: usize,
    /// Vertex and index bytes handed over by mesh swaps
    pub uploaded_bytes: usize,
    /// Color bytes handed over by arrived terrain data
    pub texture_bytes: usize,
}

impl TerrainPresenter for LoggingPresenter {
    fn chunk_created(&mut self, coord: ChunkCoord, position: Vec3) {
        self.created += 1;
        trace!("Chunk {coord} placed at {position}");
    }

    fn chunk_data_ready(&mut self, _coord: ChunkCoord, data: &TerrainData) {
        self.texture_bytes += data.colors.as_bytes().len();
    }

    fn set_visible(&mut self, coord: ChunkCoord, visible: bool) {
        trace!("Chunk {coord} {}", if visible { "shown" } else { "hidden" });
    }

    fn set_mesh(&mut self, coord: ChunkCoord, lod_index: usize, mesh: &Arc<MeshData>) {
        self.mesh_swaps += 1;
        self.uploaded_bytes += mesh.vertex_bytes().len() + mesh.index_bytes().len();
        debug!(
            "Chunk {coord} now at lod index {lod_index} ({} triangles)",
            mesh.triangle_count()
        );
    }
}

/// Moves a point along waypoints at constant speed.
#[derive(Debug, Clone)]
pub struct PathWalker {
    waypoints: Vec<Vec2>,
    next: usize,
    position: Vec2,
}

impl PathWalker {
    /// Starts at the first waypoint.
    #[must_use]
    pub fn new(waypoints: Vec<Vec2>) -> Self {
        let position = waypoints.first().copied().unwrap_or(Vec2::ZERO);
        Self {
            waypoints,
            next: 1,
            position,
        }
    }

    /// Travels `distance` along the path and returns the new position.
    pub fn advance(&mut self, mut distance: f32) -> Vec2 {
        while distance > 0.0 {
            let Some(&target) = self.waypoints.get(self.next) else {
                break;
            };
            let remaining = self.position.distance(target);
            if remaining <= distance {
                self.position = target;
                self.next += 1;
                distance -= remaining;
            } else {
                self.position += (target - self.position) / remaining * distance;
                distance = 0.0;
            }
        }
        self.position
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Returns true once the last waypoint is reached.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.next >= self.waypoints.len()
    }
}

/// Runs the streaming loop until the tick limit, or until the path ends and
/// all generation work has landed.
pub fn run(mut config: EngineConfig) -> Result<()> {
    config.validate();

    let service = GenerationService::from_config(&config.terrain)?;
    info!("Generation pool: {} workers", service.pool().worker_count());

    let mut walker = PathWalker::new(config.waypoints());
    let observer = SharedObserver::new(walker.position());
    let mut streaming =
        StreamingController::new(&config.terrain, service, LoggingPresenter::default(), observer.clone())?;
    let mut timing = TickTiming::new(config.ticks_per_second);
    info!(
        "Ticking at {} Hz ({:?} per tick)",
        timing.ticks_per_second(),
        timing.tick_budget()
    );

    let mut tick: u64 = 0;
    loop {
        let dt = timing.begin_tick();
        observer.set(walker.advance(config.observer_speed * dt));

        let report = streaming.tick();
        tick += 1;
        timing.end_tick();

        if report.rebuilt {
            debug!("Tick {tick}: visible window rebuilt at {}", observer.get());
        }
        if config.stats_interval > 0 && tick % u64::from(config.stats_interval) == 0 {
            let stats = streaming.stats();
            info!(
                "Tick {tick}: {} chunks, {} visible, {} awaiting data, {} meshes pending, {} ready, {:.2} ms/tick",
                stats.chunks,
                stats.visible,
                stats.awaiting_data,
                stats.pending_meshes,
                stats.ready_meshes,
                timing.average_tick_ms()
            );
        }

        if config.run_ticks > 0 && tick >= config.run_ticks {
            break;
        }
        if config.run_ticks == 0 && walker.finished() && streaming.requests().pending() == 0 {
            break;
        }

        timing.sleep_remainder();
    }

    let stats = streaming.stats();
    let presenter = streaming.presenter();
    info!(
        "Streaming finished after {tick} ticks: {} chunks ({} placed), {} mesh swaps, {} KiB meshes, {} KiB colors, {} failed chunks, {} failed meshes",
        stats.chunks,
        presenter.created,
        presenter.mesh_swaps,
        presenter.uploaded_bytes / 1024,
        presenter.texture_bytes / 1024,
        stats.failed_chunks,
        stats.failed_meshes
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_world::DetailLevel;

    #[test]
    fn test_path_walker_follows_waypoints() {
        let mut walker = PathWalker::new(vec![Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)]);
        assert_eq!(walker.advance(4.0), Vec2::new(4.0, 0.0));
        assert_eq!(walker.advance(10.0), Vec2::new(10.0, 4.0));
        assert!(!walker.finished());
        assert_eq!(walker.advance(100.0), Vec2::new(10.0, 10.0));
        assert!(walker.finished());
    }

    #[test]
    fn test_path_walker_single_point() {
        let mut walker = PathWalker::new(vec![Vec2::new(3.0, 3.0)]);
        assert!(walker.finished());
        assert_eq!(walker.advance(5.0), Vec2::new(3.0, 3.0));
    }

    #[test]
    fn test_headless_run_with_tick_limit() {
        let mut config = EngineConfig::default();
        config.run_ticks = 5;
        config.ticks_per_second = 240;
        config.terrain.chunk_resolution = 25;
        config.terrain.detail_levels = vec![
            DetailLevel::new(0, 15.0),
            DetailLevel::new(1, 30.0),
            DetailLevel::new(2, 45.0),
        ];
        config.terrain.worker_threads = Some(2);
        run(config).expect("run");
    }
}
