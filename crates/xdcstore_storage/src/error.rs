//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A row or value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Stored data failed an integrity check.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// An insert targeted an id that is already stored.
    #[error("entry already exists: {0}")]
    AlreadyExists(String),

    /// Another process holds the store directory.
    #[error("store is locked by another process: {0}")]
    Locked(String),

    /// The store is closed.
    #[error("storage is closed")]
    Closed,
}

impl StorageError {
    /// Returns true if repeating the operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}
