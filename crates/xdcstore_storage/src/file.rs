//! File-based catalog store for persistent storage.

use crate::codec::{decode, encode, file_name_to_key, key_to_file_name};
use crate::error::{StorageError, StorageResult};
use crate::store::CatalogStore;
use async_trait::async_trait;
use bytes::Bytes;
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use xdcstore_protocol::{CachedBinary, CatalogEntry};

const LOCK_FILE: &str = "LOCK";
const ENTRIES_DIR: &str = "entries";
const BINARIES_DIR: &str = "binaries";
const ROW_EXT: &str = "row";
const BINARY_EXT: &str = "bin";

/// On-disk form of a cached binary.
#[derive(Serialize, Deserialize)]
struct StoredBinary {
    name: String,
    digest: Vec<u8>,
    data: Bytes,
}

/// A directory-backed catalog store.
///
/// Each row and each binary lives in its own file, named by the hex
/// encoding of the item id. Rows are CBOR encoded; binaries carry a SHA-256
/// digest that is verified on every read.
///
/// # Layout
///
/// ```text
/// <dir>/LOCK
/// <dir>/entries/<hex id>.row
/// <dir>/binaries/<hex id>.bin
/// ```
///
/// # Durability
///
/// Every write goes to a temporary file which is synced and then renamed
/// over the target, so a crash leaves either the old or the new version.
///
/// # Exclusivity
///
/// The store holds an exclusive lock on `<dir>/LOCK` until it is closed or
/// dropped. A second open of the same directory fails with
/// [`StorageError::Locked`].
///
/// # Example
///
/// ```no_run
/// use xdcstore_storage::{CatalogStore, FileCatalogStore};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = FileCatalogStore::open(Path::new("catalog")).unwrap();
/// let rows = store.get_all().await.unwrap();
/// # }
/// ```
#[derive(Debug)]
pub struct FileCatalogStore {
    dir: PathBuf,
    lock: Mutex<Option<File>>,
}

impl FileCatalogStore {
    /// Opens or creates a store in `dir`, creating directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another handle holds the
    /// directory, or an I/O error if it cannot be created.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(dir.join(ENTRIES_DIR))?;
        std::fs::create_dir_all(dir.join(BINARIES_DIR))?;

        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        lock.try_lock_exclusive()
            .map_err(|_| StorageError::Locked(dir.display().to_string()))?;

        debug!(dir = %dir.display(), "opened catalog store");
        Ok(Self {
            dir: dir.to_path_buf(),
            lock: Mutex::new(Some(lock)),
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Releases the directory lock. Further operations fail with
    /// [`StorageError::Closed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be released.
    pub fn close(&self) -> StorageResult<()> {
        if let Some(lock) = self.lock.lock().take() {
            lock.unlock()?;
        }
        Ok(())
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.lock.lock().is_some() {
            Ok(())
        } else {
            Err(StorageError::Closed)
        }
    }

    fn row_path(&self, id: &str) -> PathBuf {
        self.dir
            .join(ENTRIES_DIR)
            .join(format!("{}.{ROW_EXT}", key_to_file_name(id)))
    }

    fn binary_path(&self, id: &str) -> PathBuf {
        self.dir
            .join(BINARIES_DIR)
            .join(format!("{}.{BINARY_EXT}", key_to_file_name(id)))
    }

    async fn read_row(&self, path: &Path) -> StorageResult<Option<CatalogEntry>> {
        match read_optional(path).await? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn write_row(&self, entry: &CatalogEntry) -> StorageResult<()> {
        write_atomic(&self.row_path(&entry.id), &encode(entry)?).await
    }

    async fn list_ids(&self, namespace: &str, ext: &str) -> StorageResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut dir = tokio::fs::read_dir(self.dir.join(namespace)).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(file_name_to_key);
            match key {
                Some(id) => ids.push(id),
                None => warn!(path = %path.display(), "ignoring unrecognized file in store"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl Drop for FileCatalogStore {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.get_mut().take() {
            let _ = lock.unlock();
        }
    }
}

#[async_trait]
impl CatalogStore for FileCatalogStore {
    async fn get_all(&self) -> StorageResult<Vec<CatalogEntry>> {
        self.ensure_open()?;
        let mut rows = Vec::new();
        for id in self.list_ids(ENTRIES_DIR, ROW_EXT).await? {
            if let Some(entry) = self.read_row(&self.row_path(&id)).await? {
                if entry.id != id {
                    return Err(StorageError::Corrupted(format!(
                        "row file for `{id}` holds entry `{}`",
                        entry.id
                    )));
                }
                rows.push(entry);
            }
        }
        Ok(rows)
    }

    async fn get(&self, id: &str) -> StorageResult<Option<CatalogEntry>> {
        self.ensure_open()?;
        self.read_row(&self.row_path(id)).await
    }

    async fn insert_many(&self, entries: &[CatalogEntry]) -> StorageResult<()> {
        self.ensure_open()?;
        let mut seen = BTreeSet::new();
        for entry in entries {
            if !seen.insert(entry.id.as_str())
                || tokio::fs::try_exists(self.row_path(&entry.id)).await?
            {
                return Err(StorageError::AlreadyExists(entry.id.clone()));
            }
        }
        for entry in entries {
            self.write_row(entry).await?;
        }
        Ok(())
    }

    async fn update_many(&self, entries: &[CatalogEntry]) -> StorageResult<()> {
        self.ensure_open()?;
        for entry in entries {
            self.write_row(entry).await?;
        }
        Ok(())
    }

    async fn delete_many(&self, ids: &[String]) -> StorageResult<()> {
        self.ensure_open()?;
        for id in ids {
            remove_optional(&self.row_path(id)).await?;
        }
        Ok(())
    }

    async fn put_binary(&self, id: &str, binary: &CachedBinary) -> StorageResult<()> {
        self.ensure_open()?;
        let stored = StoredBinary {
            name: binary.name.clone(),
            digest: Sha256::digest(&binary.data).to_vec(),
            data: binary.data.clone(),
        };
        write_atomic(&self.binary_path(id), &encode(&stored)?).await
    }

    async fn get_binary(&self, id: &str) -> StorageResult<Option<CachedBinary>> {
        self.ensure_open()?;
        let Some(bytes) = read_optional(&self.binary_path(id)).await? else {
            return Ok(None);
        };
        let stored: StoredBinary = decode(&bytes)?;
        if Sha256::digest(&stored.data).as_slice() != stored.digest.as_slice() {
            return Err(StorageError::Corrupted(format!(
                "digest mismatch for binary `{id}`"
            )));
        }
        Ok(Some(CachedBinary {
            name: stored.name,
            data: stored.data,
        }))
    }

    async fn delete_binary(&self, id: &str) -> StorageResult<()> {
        self.ensure_open()?;
        remove_optional(&self.binary_path(id)).await
    }

    async fn binary_ids(&self) -> StorageResult<Vec<String>> {
        self.ensure_open()?;
        self.list_ids(BINARIES_DIR, BINARY_EXT).await
    }
}

/// Reads a file, mapping "not found" to `None`.
pub(crate) async fn read_optional(path: &Path) -> StorageResult<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Removes a file, ignoring "not found".
pub(crate) async fn remove_optional(path: &Path) -> StorageResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Writes `data` to a temporary sibling, syncs it and renames it over `path`.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    tokio::io::AsyncWriteExt::write_all(&mut file, data).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
