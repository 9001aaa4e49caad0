//! Error types for the catalog engine.

use thiserror::Error;
use xdcstore_protocol::DownloadState;
use xdcstore_storage::StorageError;

use crate::download::DownloadEvent;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while applying messages or user intents.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The persistent store failed; the in-memory catalog was left unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The host channel could not deliver a request.
    #[error("channel error: {message}")]
    Channel {
        /// Error message.
        message: String,
        /// Whether the send can be retried.
        retryable: bool,
    },

    /// No catalog entry has this id.
    #[error("unknown catalog entry: {0}")]
    UnknownEntry(String),

    /// The requested action is not valid in the entry's current state.
    #[error("cannot apply {event:?} to entry {id} in state {from}")]
    InvalidTransition {
        /// Entry id.
        id: String,
        /// Current state.
        from: DownloadState,
        /// Rejected event.
        event: DownloadEvent,
    },

    /// The entry has no cached binary.
    #[error("entry {0} has no cached binary")]
    NotCached(String),

    /// A persisted engine value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

impl EngineError {
    /// Creates a retryable channel error.
    pub fn channel_retryable(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable channel error.
    pub fn channel_fatal(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Storage(err) => err.is_transient(),
            EngineError::Channel { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn retryable_errors() {
        assert!(EngineError::channel_retryable("host busy").is_retryable());
        assert!(!EngineError::channel_fatal("closed").is_retryable());
        assert!(
            EngineError::Storage(StorageError::Io(io::Error::from(io::ErrorKind::Interrupted)))
                .is_retryable()
        );
        assert!(!EngineError::Storage(StorageError::Closed).is_retryable());
        assert!(!EngineError::UnknownEntry("a".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = EngineError::InvalidTransition {
            id: "poll".into(),
            from: DownloadState::Received,
            event: DownloadEvent::UserRequested,
        };
        assert!(err.to_string().contains("poll"));
        assert!(err.to_string().contains("received"));

        let err = EngineError::NotCached("poll".into());
        assert_eq!(err.to_string(), "entry poll has no cached binary");
    }
}
