//! # xdcstore Engine
//!
//! Catalog synchronization and local-cache reconciliation for xdcstore.
//!
//! This crate provides:
//! - Reconciliation of full snapshots and delta patches against the local
//!   catalog and its persistent store
//! - The per-entry download state machine
//! - Sync cursor management and refresh coordination
//! - A change feed for presentation layers
//! - The [`CatalogClient`] facade that serializes all writes
//!
//! ## Architecture
//!
//! The host is authoritative. Every catalog update is planned as a pure
//! [`Reconciliation`], its [`StorageEffects`] are executed against the
//! [`xdcstore_storage::CatalogStore`], and only then is the in-memory
//! catalog replaced and the change published.
//!
//! ## Key Invariants
//!
//! - A delta patch is admitted only if its `old_serial` equals the cursor
//! - The cursor advances only after a successful merge
//! - A failed store write leaves the in-memory catalog and cursor unchanged
//!   and forces the next refresh to ask for a full snapshot
//! - At most one refresh request is in flight

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod client;
mod config;
mod coordinator;
mod download;
mod error;
mod feed;
mod flags;
mod reconcile;
mod retry;
mod transport;

pub use catalog::Catalog;
pub use client::{ApplyOutcome, ApplySummary, CatalogClient, CATALOG_DIR, STATE_DIR};
pub use config::{ClientConfig, RetryConfig};
pub use coordinator::{RefreshTrigger, SyncCoordinator, SyncCursor};
pub use download::{transition, DownloadEvent};
pub use error::{EngineError, EngineResult};
pub use feed::{CatalogChange, CatalogEvent, ChangeFeed};
pub use flags::ClientFlags;
pub use reconcile::{
    apply, apply_delta, apply_download_failed, apply_download_succeeded, apply_event,
    apply_snapshot, Reconciliation, RejectReason, StorageEffects,
};
pub use transport::{HostChannel, MockChannel};
