//! Error types for the Lacquer core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration outside the supported set (sample rate, block size,
    /// channel count). Raised at construction time only; the real-time
    /// path never surfaces errors once a graph is built.
    #[error("Unsupported configuration: {0}")]
    Unsupported(String),

    /// Mismatched buffer lengths
    #[error("Buffer size mismatch: expected {expected}, got {got}")]
    BufferMismatch {
        /// Expected size
        expected: usize,
        /// Actual size
        got: usize,
    },
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
