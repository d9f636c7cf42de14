//! Error types for Project Horizon.

use thiserror::Error;

/// Top-level error type for Horizon operations.
#[derive(Debug, Error)]
pub enum HorizonError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generation errors
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration precondition violations, rejected before streaming starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// No detail levels configured
    #[error("Detail level list is empty")]
    EmptyDetailLevels,

    /// Detail level thresholds are not ascending
    #[error("Detail level {index} threshold {threshold} is below the previous threshold {previous}")]
    UnsortedDetailLevels {
        /// Index of the offending entry
        index: usize,
        /// Its threshold
        threshold: f32,
        /// Threshold of the entry before it
        previous: f32,
    },

    /// A threshold is NaN, infinite or negative
    #[error("Detail level {index} has invalid threshold {threshold}")]
    InvalidThreshold {
        /// Index of the offending entry
        index: usize,
        /// Its threshold
        threshold: f32,
    },

    /// Chunk resolution too small to form a single quad
    #[error("Chunk resolution must be at least 2, got {0}")]
    InvalidResolution(u32),

    /// Detail level step does not divide the chunk edge
    #[error("Detail level {level} (step {step}) does not divide chunk edge {edge}")]
    IncompatibleDetailLevel {
        /// Detail level
        level: u32,
        /// Vertex step for that level
        step: u32,
        /// Chunk edge length in samples minus one
        edge: u32,
    },

    /// Detail level so large its vertex step does not fit in a `u32`
    #[error("Detail level {0} is out of range")]
    DetailLevelOutOfRange(u32),

    /// Height curve keys are not sorted by time
    #[error("Height curve key {0} is out of order")]
    UnsortedCurve(usize),

    /// Worker pool configured with no threads
    #[error("Worker thread count must be non-zero")]
    NoWorkers,

    /// Config file could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Failures of a single generation request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// The work closure panicked on the worker thread
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    /// The pool was shut down before the job could run
    #[error("Worker pool is shut down")]
    PoolShutDown,

    /// The height field cannot be meshed at the requested detail level
    #[error("Height field {width}x{height} cannot be meshed at detail level {level}")]
    UnsupportedDetailLevel {
        /// Field width
        width: usize,
        /// Field height
        height: usize,
        /// Requested detail level
        level: u32,
    },

    /// Collaborator-specific failure
    #[error("{0}")]
    Failed(String),
}

/// Result type alias for Horizon operations.
pub type HorizonResult<T> = Result<T, HorizonError>;
