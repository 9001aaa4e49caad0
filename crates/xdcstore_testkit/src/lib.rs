//! # xdcstore Testkit
//!
//! Test utilities for xdcstore.
//!
//! This crate provides:
//! - Sample catalog data and host payload builders
//! - Store wrappers that record calls or inject failures
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xdcstore_testkit::prelude::*;
//!
//! let store = RecordingStore::new(InMemoryCatalogStore::new());
//! let init = init_json(1, &["poll", "chess"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stores;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stores::*;
    pub use xdcstore_storage::{CatalogStore, InMemoryCatalogStore, InMemoryScalarStore};
}

pub use fixtures::*;
pub use generators::*;
pub use stores::*;
