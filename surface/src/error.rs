//! Error type shared by every surface operation.
//!
//! Only precondition violations are reported here. Out-of-grid wave targets and
//! neighbor lookups are clipped silently by the code that performs them.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    /// Width or height below the two-cell minimum.
    #[error("invalid grid dimensions {width}x{height}: both sides must be at least 2")]
    InvalidDimensions { width: usize, height: usize },

    /// A height, velocity or mask buffer does not match the grid cell count.
    #[error("{name} buffer holds {actual} cells, expected {expected}")]
    SizeMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The first step was requested without dimensions, heights and velocities.
    #[error("first step requires grid dimensions, heights and velocities together")]
    IncompleteInitialization,

    /// An operation needs a seeded surface but none exists yet.
    #[error("surface has not been initialized")]
    NotInitialized,

    /// Dimensions were supplied after the grid size was fixed.
    #[error("grid dimensions are locked at {width}x{height} and cannot be changed")]
    DimensionsLocked { width: usize, height: usize },

    /// A strip window does not fit in the dispatch arena.
    #[error("dispatch of {requested} cells exceeds arena capacity of {capacity} cells")]
    CapacityExceeded { requested: usize, capacity: usize },

    #[error("invalid batch configuration: {0}")]
    InvalidBatchConfig(String),

    /// A previous step failed part way and left the session in an unknown state.
    #[error("session is unusable after a failed step")]
    SessionPoisoned,

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl From<bincode::Error> for SurfaceError {
    fn from(err: bincode::Error) -> Self {
        SurfaceError::Snapshot(err.to_string())
    }
}

impl From<std::io::Error> for SurfaceError {
    fn from(err: std::io::Error) -> Self {
        SurfaceError::Snapshot(err.to_string())
    }
}
