//! Scalar storage for small process-wide values.
//!
//! The engine keeps its sync cursor and client flags here, outside the
//! catalog namespaces, so that losing the catalog directory can be
//! detected on the next load.

use crate::codec::{decode, encode, key_to_file_name};
use crate::error::StorageResult;
use crate::file::{read_optional, remove_optional, write_atomic};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A durable map from string keys to opaque byte values.
#[async_trait]
pub trait ScalarStore: Send + Sync {
    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be read.
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    async fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removes `key`. Missing keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be removed.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

#[async_trait]
impl<T: ScalarStore + ?Sized> ScalarStore for Arc<T> {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        (**self).put(key, value).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key).await
    }
}

/// Loads and decodes a typed value.
///
/// # Errors
///
/// Returns an error if the value cannot be read or decoded.
pub async fn load_value<T, S>(store: &S, key: &str) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
    S: ScalarStore + ?Sized,
{
    match store.get(key).await? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

/// Encodes and stores a typed value.
///
/// # Errors
///
/// Returns an error if the value cannot be encoded or written.
pub async fn store_value<T, S>(store: &S, key: &str, value: &T) -> StorageResult<()>
where
    T: Serialize + Sync,
    S: ScalarStore + ?Sized,
{
    let bytes = encode(value)?;
    store.put(key, &bytes).await
}

/// An in-memory scalar store for tests.
#[derive(Debug, Default)]
pub struct InMemoryScalarStore {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryScalarStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the keys currently stored.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.values.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ScalarStore for InMemoryScalarStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.values.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// A scalar store keeping one file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileScalarStore {
    dir: PathBuf,
}

impl FileScalarStore {
    /// Opens or creates a scalar store in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.val", key_to_file_name(key)))
    }
}

#[async_trait]
impl ScalarStore for FileScalarStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        read_optional(&self.path(key)).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        write_atomic(&self.path(key), value).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        remove_optional(&self.path(key)).await
    }
}
