//! Error types
//!
//! Only configuration and storage problems are errors. Sensor denial,
//! out-of-grid collision queries and stale calibration are ordinary states.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MazeError {
    #[error("maze dimensions must be at least 1x1, got {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("loop factor must be a finite non-negative number, got {0}")]
    InvalidLoopFactor(f32),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MazeError>;
