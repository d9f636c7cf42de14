//! Worker-to-owner handoff queues.
//!
//! Workers push tagged completion records from any thread; the owning
//! thread drains them once per tick and routes each record itself. Nothing
//! that belongs to the owning thread ever crosses the queue.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use horizon_common::{ChunkCoord, GenerationError, RequestId};

use crate::generation::TerrainData;
use crate::mesh::MeshData;

/// Multi-producer FIFO drained by a single owner.
#[derive(Debug)]
pub struct DispatchQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> Default for DispatchQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DispatchQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// Returns a handle workers can enqueue through.
    #[must_use]
    pub fn sender(&self) -> DispatchSender<T> {
        DispatchSender {
            sender: self.sender.clone(),
        }
    }

    /// Enqueues a record.
    pub fn enqueue(&self, record: T) {
        // The queue owns a receiver, so the channel cannot be disconnected.
        let _ = self.sender.send(record);
    }

    /// Number of records waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns true if nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Dispatches every record enqueued before this call, in FIFO order.
    ///
    /// The count is captured up front: records enqueued while handlers run
    /// are left for the next drain. Enqueuers are never blocked by a drain.
    /// Returns the number dispatched.
    pub fn drain_and_dispatch(&self, mut handler: impl FnMut(T)) -> usize {
        let pending = self.receiver.len();
        let mut dispatched = 0;
        for _ in 0..pending {
            match self.receiver.try_recv() {
                Ok(record) => {
                    handler(record);
                    dispatched += 1;
                },
                Err(_) => break,
            }
        }
        dispatched
    }
}

/// Cloneable, thread-safe enqueue handle.
#[derive(Debug)]
pub struct DispatchSender<T> {
    sender: Sender<T>,
}

impl<T> Clone for DispatchSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> DispatchSender<T> {
    /// Enqueues a record. Returns false if the queue has been dropped.
    pub fn enqueue(&self, record: T) -> bool {
        self.sender.send(record).is_ok()
    }
}

/// Height field (and colors) generated for a chunk.
#[derive(Debug)]
pub struct TerrainDataReady {
    /// Originating request
    pub request: RequestId,
    /// Chunk the data belongs to
    pub coord: ChunkCoord,
    /// Outcome
    pub result: Result<TerrainData, GenerationError>,
}

/// Mesh generated for one detail level of a chunk.
#[derive(Debug)]
pub struct MeshReady {
    /// Originating request
    pub request: RequestId,
    /// Chunk the mesh belongs to
    pub coord: ChunkCoord,
    /// Index into the detail level list
    pub lod_index: usize,
    /// Outcome
    pub result: Result<Arc<MeshData>, GenerationError>,
}

/// Either kind of completion, as routed to a chunk.
#[derive(Debug)]
pub enum Completion {
    /// Height field arrived
    TerrainData(TerrainDataReady),
    /// Mesh arrived
    Mesh(MeshReady),
}

impl Completion {
    /// Chunk this completion is addressed to.
    #[must_use]
    pub fn coord(&self) -> ChunkCoord {
        match self {
            Self::TerrainData(ready) => ready.coord,
            Self::Mesh(ready) => ready.coord,
        }
    }
}

/// The owner's pair of completion queues.
#[derive(Debug, Default)]
pub struct CompletionQueues {
    /// Height field results
    pub terrain: DispatchQueue<TerrainDataReady>,
    /// Mesh results
    pub meshes: DispatchQueue<MeshReady>,
}

impl CompletionQueues {
    /// Creates empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains height field results, then mesh results.
    pub fn drain_and_dispatch(&self, mut handler: impl FnMut(Completion)) -> usize {
        let terrain = self
            .terrain
            .drain_and_dispatch(|ready| handler(Completion::TerrainData(ready)));
        let meshes = self.meshes.drain_and_dispatch(|ready| handler(Completion::Mesh(ready)));
        terrain + meshes
    }

    /// Records waiting in both queues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terrain.len() + self.meshes.len()
    }

    /// Returns true if both queues are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terrain.is_empty() && self.meshes.is_empty()
    }
}
