//! Error types for the real-time chain

use lacquer_core::CoreError;
use thiserror::Error;

/// Chain error type. Construction-time only: once a graph is built the
/// audio path never surfaces errors.
#[derive(Error, Debug)]
pub enum ChainError {
    /// Configuration outside the supported set
    #[error("Unsupported configuration: {0}")]
    Unsupported(String),

    /// A chain instance already exists for this process
    #[error("A mastering chain is already active in this process")]
    AlreadyActive,
}

impl From<CoreError> for ChainError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unsupported(reason) => ChainError::Unsupported(reason),
            CoreError::BufferMismatch { expected, got } => {
                ChainError::Unsupported(format!("buffer mismatch: expected {expected}, got {got}"))
            }
        }
    }
}

/// Result type for chain operations
pub type ChainResult<T> = Result<T, ChainError>;
