// src/error.rs

use thiserror::Error;

/// Error kinds produced by the WSOLA engine and its collaborators.
///
/// Only [`EngineError::InvalidConfig`] and [`EngineError::IoError`] are meant
/// to propagate all the way to the user; the rest are logged and handled
/// locally by the driver (see `playback::driver`).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("not enough data buffered to form a frame yet")]
    InsufficientData,

    #[error("failed to fetch {length} samples starting at absolute offset {start_abs}")]
    SegmentFetchFailure { start_abs: u64, length: usize },

    #[error("ring overflow: producer outran consumer by {overrun} samples")]
    RingOverflow { overrun: usize },

    #[error("host audio underrun")]
    HostUnderrun,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
