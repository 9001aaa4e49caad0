//! Catalog store wrappers for call-level assertions and failure injection.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use xdcstore_protocol::{CachedBinary, CatalogEntry};
use xdcstore_storage::{CatalogStore, StorageError, StorageResult};

/// One recorded store call, with the ids it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `get_all`
    GetAll,
    /// `get(id)`
    Get(String),
    /// `insert_many` with these ids.
    InsertMany(Vec<String>),
    /// `update_many` with these ids.
    UpdateMany(Vec<String>),
    /// `delete_many` with these ids.
    DeleteMany(Vec<String>),
    /// `put_binary(id)`
    PutBinary(String),
    /// `get_binary(id)`
    GetBinary(String),
    /// `delete_binary(id)`
    DeleteBinary(String),
    /// `binary_ids`
    BinaryIds,
}

/// A store operation, without arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `get_all`
    GetAll,
    /// `get`
    Get,
    /// `insert_many`
    InsertMany,
    /// `update_many`
    UpdateMany,
    /// `delete_many`
    DeleteMany,
    /// `put_binary`
    PutBinary,
    /// `get_binary`
    GetBinary,
    /// `delete_binary`
    DeleteBinary,
    /// `binary_ids`
    BinaryIds,
}

impl StoreCall {
    /// Returns the operation of this call.
    pub fn op(&self) -> StoreOp {
        match self {
            StoreCall::GetAll => StoreOp::GetAll,
            StoreCall::Get(_) => StoreOp::Get,
            StoreCall::InsertMany(_) => StoreOp::InsertMany,
            StoreCall::UpdateMany(_) => StoreOp::UpdateMany,
            StoreCall::DeleteMany(_) => StoreOp::DeleteMany,
            StoreCall::PutBinary(_) => StoreOp::PutBinary,
            StoreCall::GetBinary(_) => StoreOp::GetBinary,
            StoreCall::DeleteBinary(_) => StoreOp::DeleteBinary,
            StoreCall::BinaryIds => StoreOp::BinaryIds,
        }
    }

    /// Returns true for calls that modify the store.
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            StoreCall::GetAll | StoreCall::Get(_) | StoreCall::GetBinary(_) | StoreCall::BinaryIds
        )
    }
}

fn ids(entries: &[CatalogEntry]) -> Vec<String> {
    entries.iter().map(|e| e.id.clone()).collect()
}

/// Records every call before forwarding it to the inner store.
#[derive(Debug, Default)]
pub struct RecordingStore<S> {
    inner: S,
    calls: Mutex<Vec<StoreCall>>,
}

impl<S> RecordingStore<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns every call so far.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Returns the write calls so far.
    pub fn writes(&self) -> Vec<StoreCall> {
        self.calls.lock().iter().filter(|c| c.is_write()).cloned().collect()
    }

    /// Returns the calls of one operation.
    pub fn calls_of(&self, op: StoreOp) -> Vec<StoreCall> {
        self.calls.lock().iter().filter(|c| c.op() == op).cloned().collect()
    }

    /// Forgets recorded calls.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl<S: CatalogStore> CatalogStore for RecordingStore<S> {
    async fn get_all(&self) -> StorageResult<Vec<CatalogEntry>> {
        self.record(StoreCall::GetAll);
        self.inner.get_all().await
    }

    async fn get(&self, id: &str) -> StorageResult<Option<CatalogEntry>> {
        self.record(StoreCall::Get(id.into()));
        self.inner.get(id).await
    }

    async fn insert_many(&self, entries: &[CatalogEntry]) -> StorageResult<()> {
        self.record(StoreCall::InsertMany(ids(entries)));
        self.inner.insert_many(entries).await
    }

    async fn update_many(&self, entries: &[CatalogEntry]) -> StorageResult<()> {
        self.record(StoreCall::UpdateMany(ids(entries)));
        self.inner.update_many(entries).await
    }

    async fn delete_many(&self, ids: &[String]) -> StorageResult<()> {
        self.record(StoreCall::DeleteMany(ids.to_vec()));
        self.inner.delete_many(ids).await
    }

    async fn put_binary(&self, id: &str, binary: &CachedBinary) -> StorageResult<()> {
        self.record(StoreCall::PutBinary(id.into()));
        self.inner.put_binary(id, binary).await
    }

    async fn get_binary(&self, id: &str) -> StorageResult<Option<CachedBinary>> {
        self.record(StoreCall::GetBinary(id.into()));
        self.inner.get_binary(id).await
    }

    async fn delete_binary(&self, id: &str) -> StorageResult<()> {
        self.record(StoreCall::DeleteBinary(id.into()));
        self.inner.delete_binary(id).await
    }

    async fn binary_ids(&self) -> StorageResult<Vec<String>> {
        self.record(StoreCall::BinaryIds);
        self.inner.binary_ids().await
    }
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Permanent,
    Transient(u32),
}

/// Fails selected operations before they reach the inner store.
#[derive(Debug, Default)]
pub struct FailingStore<S> {
    inner: S,
    failures: Mutex<HashMap<StoreOp, Failure>>,
}

impl<S> FailingStore<S> {
    /// Wraps `inner` with no failures armed.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Makes `op` fail with a non-retryable error until healed.
    pub fn fail(&self, op: StoreOp) {
        self.failures.lock().insert(op, Failure::Permanent);
    }

    /// Makes the next `times` calls of `op` fail with a retryable error.
    pub fn fail_transient(&self, op: StoreOp, times: u32) {
        self.failures.lock().insert(op, Failure::Transient(times));
    }

    /// Disarms the failure for `op`.
    pub fn heal(&self, op: StoreOp) {
        self.failures.lock().remove(&op);
    }

    /// Disarms every failure.
    pub fn heal_all(&self) {
        self.failures.lock().clear();
    }

    fn check(&self, op: StoreOp) -> StorageResult<()> {
        let mut failures = self.failures.lock();
        match failures.get_mut(&op) {
            Some(Failure::Permanent) => Err(StorageError::Io(io::Error::other(format!(
                "injected {op:?} failure"
            )))),
            Some(Failure::Transient(remaining)) if *remaining > 0 => {
                *remaining -= 1;
                Err(StorageError::Io(io::Error::new(
                    io::ErrorKind::Interrupted,
                    format!("injected transient {op:?} failure"),
                )))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl<S: CatalogStore> CatalogStore for FailingStore<S> {
    async fn get_all(&self) -> StorageResult<Vec<CatalogEntry>> {
        self.check(StoreOp::GetAll)?;
        self.inner.get_all().await
    }

    async fn get(&self, id: &str) -> StorageResult<Option<CatalogEntry>> {
        self.check(StoreOp::Get)?;
        self.inner.get(id).await
    }

    async fn insert_many(&self, entries: &[CatalogEntry]) -> StorageResult<()> {
        self.check(StoreOp::InsertMany)?;
        self.inner.insert_many(entries).await
    }

    async fn update_many(&self, entries: &[CatalogEntry]) -> StorageResult<()> {
        self.check(StoreOp::UpdateMany)?;
        self.inner.update_many(entries).await
    }

    async fn delete_many(&self, ids: &[String]) -> StorageResult<()> {
        self.check(StoreOp::DeleteMany)?;
        self.inner.delete_many(ids).await
    }

    async fn put_binary(&self, id: &str, binary: &CachedBinary) -> StorageResult<()> {
        self.check(StoreOp::PutBinary)?;
        self.inner.put_binary(id, binary).await
    }

    async fn get_binary(&self, id: &str) -> StorageResult<Option<CachedBinary>> {
        self.check(StoreOp::GetBinary)?;
        self.inner.get_binary(id).await
    }

    async fn delete_binary(&self, id: &str) -> StorageResult<()> {
        self.check(StoreOp::DeleteBinary)?;
        self.inner.delete_binary(id).await
    }

    async fn binary_ids(&self) -> StorageResult<Vec<String>> {
        self.check(StoreOp::BinaryIds)?;
        self.inner.binary_ids().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_entry;
    use xdcstore_protocol::DownloadState;
    use xdcstore_storage::InMemoryCatalogStore;

    #[tokio::test]
    async fn recording_store_records_ids() {
        let store = RecordingStore::new(InMemoryCatalogStore::new());
        store
            .insert_many(&[sample_entry("a", DownloadState::Initial)])
            .await
            .unwrap();
        store.delete_many(&["b".into()]).await.unwrap();
        store.get_all().await.unwrap();

        assert_eq!(
            store.writes(),
            vec![
                StoreCall::InsertMany(vec!["a".into()]),
                StoreCall::DeleteMany(vec!["b".into()])
            ]
        );
        assert_eq!(store.calls_of(StoreOp::GetAll).len(), 1);
        store.clear();
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn failing_store_injects_errors() {
        let store = FailingStore::new(InMemoryCatalogStore::new());
        store.fail(StoreOp::UpdateMany);
        let entry = sample_entry("a", DownloadState::Initial);

        let err = store.update_many(&[entry.clone()]).await.unwrap_err();
        assert!(!err.is_transient());
        store.heal(StoreOp::UpdateMany);
        store.update_many(&[entry]).await.unwrap();

        store.fail_transient(StoreOp::GetAll, 1);
        assert!(store.get_all().await.unwrap_err().is_transient());
        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }
}
