//! # xdcstore Protocol
//!
//! Catalog data model and host channel messages for xdcstore.
//!
//! This crate provides:
//! - [`AppMetadata`] and [`MetadataPatch`] for catalog records
//! - [`CatalogEntry`], [`DownloadState`] and [`CachedBinary`]
//! - Inbound [`HostMessage`] variants and outbound [`HostRequest`]s
//! - The update classifier ([`classify`])
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod classify;
mod entry;
mod error;
mod messages;
mod metadata;

pub use classify::{classify, classify_with_reason, is_catalog_payload};
pub use entry::{CachedBinary, CatalogEntry, DownloadState};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    DeltaPatch, HostMessage, HostRequest, MessageKind, ObsoleteSeverity, RefreshRequest, Snapshot,
};
pub use metadata::{AppMetadata, MetadataPatch};
