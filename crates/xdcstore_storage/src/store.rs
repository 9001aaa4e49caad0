//! Catalog store trait definition.

use crate::error::StorageResult;
use async_trait::async_trait;
use std::sync::Arc;
use xdcstore_protocol::{CachedBinary, CatalogEntry};

/// Durable storage for catalog rows and cached binaries.
///
/// Catalog stores are **dumb keyed stores**. They hold two namespaces keyed
/// by item id: catalog rows and cached binaries. All merging, state
/// transitions and cursor bookkeeping belong to the engine.
///
/// # Invariants
///
/// - `insert_many` never overwrites; a duplicate id fails the whole batch
/// - `update_many` is an upsert
/// - `delete_many` and `delete_binary` are idempotent
/// - `put_binary` overwrites any previous binary for the id
/// - Stores must be `Send + Sync`; the engine awaits them while holding its
///   apply lock
///
/// # Implementors
///
/// - [`super::InMemoryCatalogStore`] - For testing
/// - [`super::FileCatalogStore`] - For persistent storage
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns every stored row, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be read or decoded.
    async fn get_all(&self) -> StorageResult<Vec<CatalogEntry>>;

    /// Returns the row for `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be read or decoded.
    async fn get(&self, id: &str) -> StorageResult<Option<CatalogEntry>>;

    /// Inserts new rows.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::AlreadyExists`] if any id is already
    /// stored (or repeated within the batch); nothing is written in that case.
    async fn insert_many(&self, entries: &[CatalogEntry]) -> StorageResult<()>;

    /// Inserts or replaces rows.
    ///
    /// # Errors
    ///
    /// Returns an error if a row cannot be written.
    async fn update_many(&self, entries: &[CatalogEntry]) -> StorageResult<()>;

    /// Removes rows. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a row cannot be removed.
    async fn delete_many(&self, ids: &[String]) -> StorageResult<()>;

    /// Stores the binary for `id`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the binary cannot be written.
    async fn put_binary(&self, id: &str, binary: &CachedBinary) -> StorageResult<()>;

    /// Returns the binary for `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the binary cannot be read or fails its
    /// integrity check.
    async fn get_binary(&self, id: &str) -> StorageResult<Option<CachedBinary>>;

    /// Removes the binary for `id`. Missing binaries are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the binary cannot be removed.
    async fn delete_binary(&self, id: &str) -> StorageResult<()>;

    /// Lists the ids that currently have a stored binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the binary namespace cannot be listed.
    async fn binary_ids(&self) -> StorageResult<Vec<String>>;
}

#[async_trait]
impl<T: CatalogStore + ?Sized> CatalogStore for Arc<T> {
    async fn get_all(&self) -> StorageResult<Vec<CatalogEntry>> {
        (**self).get_all().await
    }

    async fn get(&self, id: &str) -> StorageResult<Option<CatalogEntry>> {
        (**self).get(id).await
    }

    async fn insert_many(&self, entries: &[CatalogEntry]) -> StorageResult<()> {
        (**self).insert_many(entries).await
    }

    async fn update_many(&self, entries: &[CatalogEntry]) -> StorageResult<()> {
        (**self).update_many(entries).await
    }

    async fn delete_many(&self, ids: &[String]) -> StorageResult<()> {
        (**self).delete_many(ids).await
    }

    async fn put_binary(&self, id: &str, binary: &CachedBinary) -> StorageResult<()> {
        (**self).put_binary(id, binary).await
    }

    async fn get_binary(&self, id: &str) -> StorageResult<Option<CachedBinary>> {
        (**self).get_binary(id).await
    }

    async fn delete_binary(&self, id: &str) -> StorageResult<()> {
        (**self).delete_binary(id).await
    }

    async fn binary_ids(&self) -> StorageResult<Vec<String>> {
        (**self).binary_ids().await
    }
}
