//! CLI command implementations.

pub mod export;
pub mod inspect;
pub mod replay;
pub mod verify;

use std::path::Path;
use xdcstore_engine::{CATALOG_DIR, STATE_DIR};
use xdcstore_storage::{FileCatalogStore, FileScalarStore};

/// Opens the stores of an existing catalog directory without a client.
pub(crate) fn open_stores(
    path: &Path,
) -> Result<(FileCatalogStore, FileScalarStore), Box<dyn std::error::Error>> {
    if !path.join(CATALOG_DIR).is_dir() {
        return Err(format!("No catalog directory found at {:?}", path).into());
    }
    let store = FileCatalogStore::open(&path.join(CATALOG_DIR))?;
    let scalars = FileScalarStore::open(&path.join(STATE_DIR))?;
    Ok((store, scalars))
}
