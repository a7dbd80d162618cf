//! Session store error types

use thiserror::Error;

/// Errors from loading or saving session snapshots
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Session snapshot is corrupt: {0}")]
    CorruptState(String),

    #[error("Failed to read session snapshot: {0}")]
    StorageReadFailure(String),

    #[error("Failed to write session snapshot: {0}")]
    StorageWriteFailure(String),

    #[error("Session writer is not running")]
    ChannelError,
}

impl StoreError {
    /// Whether the snapshot exists but could not be understood
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::CorruptState(_))
    }
}
