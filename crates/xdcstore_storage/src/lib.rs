//! # xdcstore Storage
//!
//! Durable key-value storage for the xdcstore catalog.
//!
//! This crate provides the lowest-level storage abstraction for xdcstore.
//! It holds two namespaces keyed by item id, catalog rows and cached
//! binaries, plus a small scalar store for process-wide values such as the
//! sync cursor.
//!
//! ## Design Principles
//!
//! - Stores do not interpret catalog semantics; the engine owns all merging
//! - Every operation is async and may fail; errors are never swallowed
//! - Deletes are idempotent
//! - Stores must be `Send + Sync` so the engine can hold them across awaits
//!
//! ## Available Stores
//!
//! - [`InMemoryCatalogStore`] / [`InMemoryScalarStore`] - For testing and ephemeral clients
//! - [`FileCatalogStore`] / [`FileScalarStore`] - For persistent storage in a directory
//!
//! ## Example
//!
//! ```rust
//! use xdcstore_storage::{CatalogStore, InMemoryCatalogStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = InMemoryCatalogStore::new();
//! store.delete_many(&["missing".to_string()]).await.unwrap();
//! assert!(store.get_all().await.unwrap().is_empty());
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod error;
mod file;
mod memory;
mod scalar;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileCatalogStore;
pub use memory::InMemoryCatalogStore;
pub use scalar::{load_value, store_value, FileScalarStore, InMemoryScalarStore, ScalarStore};
pub use store::CatalogStore;
