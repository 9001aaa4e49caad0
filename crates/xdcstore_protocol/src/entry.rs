//! Catalog entries and cached binaries.

use crate::metadata::AppMetadata;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Download lifecycle state of a catalog entry.
///
/// Transitions are enforced by the engine; this type only names the states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownloadState {
    /// No binary cached.
    #[default]
    Initial,
    /// A download was requested and is outstanding.
    Downloading,
    /// The binary is cached locally.
    Received,
    /// The last download failed. Retriable by the user.
    DownloadCancelled,
    /// A binary is cached but the host announced a newer revision.
    Updating,
}

impl DownloadState {
    /// Returns true if a binary is expected in the cache.
    pub fn is_cached(&self) -> bool {
        matches!(self, DownloadState::Received | DownloadState::Updating)
    }

    /// Returns true if forward/export operations are valid.
    pub fn can_forward(&self) -> bool {
        self.is_cached()
    }
}

impl std::fmt::Display for DownloadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DownloadState::Initial => "initial",
            DownloadState::Downloading => "downloading",
            DownloadState::Received => "received",
            DownloadState::DownloadCancelled => "cancelled",
            DownloadState::Updating => "updating",
        };
        f.write_str(name)
    }
}

/// One item in the marketplace catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable item identifier.
    pub id: String,
    /// Descriptive metadata.
    pub metadata: AppMetadata,
    /// Download lifecycle state.
    pub state: DownloadState,
}

impl CatalogEntry {
    /// Creates an entry in the `Initial` state.
    pub fn new(id: impl Into<String>, metadata: AppMetadata) -> Self {
        Self {
            id: id.into(),
            metadata,
            state: DownloadState::Initial,
        }
    }

    /// Returns a copy of this entry with `state` replaced.
    #[must_use]
    pub fn with_state(mut self, state: DownloadState) -> Self {
        self.state = state;
        self
    }

    /// Returns the revision tag of the published binary.
    pub fn tag_name(&self) -> &str {
        &self.metadata.tag_name
    }
}

/// A downloaded payload owned by the persistent store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedBinary {
    /// File name used when forwarding, e.g. `poll.xdc`.
    pub name: String,
    /// Raw payload bytes.
    pub data: Bytes,
}

impl CachedBinary {
    /// Creates a cached binary named after the item's display name.
    pub fn new(display_name: &str, data: impl Into<Bytes>) -> Self {
        Self {
            name: format!("{display_name}.xdc"),
            data: data.into(),
        }
    }

    /// Returns the payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
