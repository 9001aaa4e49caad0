//! In-memory catalog store for testing.

use crate::error::{StorageError, StorageResult};
use crate::store::CatalogStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use xdcstore_protocol::{CachedBinary, CatalogEntry};

/// An in-memory catalog store.
///
/// This store keeps all rows and binaries in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral clients that don't need persistence
///
/// # Example
///
/// ```rust
/// use xdcstore_storage::{CatalogStore, InMemoryCatalogStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = InMemoryCatalogStore::new();
/// assert!(store.get("poll").await.unwrap().is_none());
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    rows: RwLock<BTreeMap<String, CatalogEntry>>,
    binaries: RwLock<BTreeMap<String, CachedBinary>>,
}

impl InMemoryCatalogStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing rows.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let rows = entries
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();
        Self {
            rows: RwLock::new(rows),
            binaries: RwLock::default(),
        }
    }

    /// Returns the number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Clears all rows and binaries.
    pub fn clear(&self) {
        self.rows.write().clear();
        self.binaries.write().clear();
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn get_all(&self) -> StorageResult<Vec<CatalogEntry>> {
        Ok(self.rows.read().values().cloned().collect())
    }

    async fn get(&self, id: &str) -> StorageResult<Option<CatalogEntry>> {
        Ok(self.rows.read().get(id).cloned())
    }

    async fn insert_many(&self, entries: &[CatalogEntry]) -> StorageResult<()> {
        let mut rows = self.rows.write();
        let mut seen = BTreeSet::new();
        for entry in entries {
            if rows.contains_key(&entry.id) || !seen.insert(entry.id.as_str()) {
                return Err(StorageError::AlreadyExists(entry.id.clone()));
            }
        }
        for entry in entries {
            rows.insert(entry.id.clone(), entry.clone());
        }
        Ok(())
    }

    async fn update_many(&self, entries: &[CatalogEntry]) -> StorageResult<()> {
        let mut rows = self.rows.write();
        for entry in entries {
            rows.insert(entry.id.clone(), entry.clone());
        }
        Ok(())
    }

    async fn delete_many(&self, ids: &[String]) -> StorageResult<()> {
        let mut rows = self.rows.write();
        for id in ids {
            rows.remove(id);
        }
        Ok(())
    }

    async fn put_binary(&self, id: &str, binary: &CachedBinary) -> StorageResult<()> {
        self.binaries.write().insert(id.to_string(), binary.clone());
        Ok(())
    }

    async fn get_binary(&self, id: &str) -> StorageResult<Option<CachedBinary>> {
        Ok(self.binaries.read().get(id).cloned())
    }

    async fn delete_binary(&self, id: &str) -> StorageResult<()> {
        self.binaries.write().remove(id);
        Ok(())
    }

    async fn binary_ids(&self) -> StorageResult<Vec<String>> {
        Ok(self.binaries.read().keys().cloned().collect())
    }
}
