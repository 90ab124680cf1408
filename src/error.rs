//! Error types for tagaa
//!
//! Provides a unified error type for all operations. Store-level conditions
//! are unit variants so callers can branch on the kind directly.

use thiserror::Error;

/// Result type alias using TagaaError
pub type Result<T> = std::result::Result<T, TagaaError>;

/// Unified error type for tagaa operations
#[derive(Debug, Error)]
pub enum TagaaError {
    // -------------------------------------------------------------------------
    // Not-found class
    // -------------------------------------------------------------------------
    #[error("not found")]
    NotFound,

    #[error("group not found")]
    GroupNotFound,

    #[error("image not found")]
    ImageNotFound,

    // -------------------------------------------------------------------------
    // Conflict class
    // -------------------------------------------------------------------------
    #[error("group already exists")]
    GroupExists,

    #[error("group not empty")]
    GroupNotEmpty,

    // -------------------------------------------------------------------------
    // Invalid input
    // -------------------------------------------------------------------------
    #[error("invalid group name: {0}")]
    InvalidGroupName(String),

    #[error("invalid blob hash: {0}")]
    InvalidHash(String),

    // -------------------------------------------------------------------------
    // Corruption class
    // -------------------------------------------------------------------------
    #[error("record decode error: {0}")]
    DecodeError(String),

    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // I/O class
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("timed out after {0:?} waiting for the store lock")]
    LockTimeout(std::time::Duration),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TagaaError {
    /// True for `NotFound`, `GroupNotFound` and `ImageNotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TagaaError::NotFound | TagaaError::GroupNotFound | TagaaError::ImageNotFound
        )
    }
}
