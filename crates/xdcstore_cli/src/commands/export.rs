//! Export command implementation.

use super::open_stores;
use std::path::{Path, PathBuf};
use xdcstore_storage::CatalogStore;

/// Runs the export command.
pub async fn run(path: &Path, id: &str, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (store, _scalars) = open_stores(path)?;
    let (target, size) = export(&store, id, out).await?;

    println!("✓ Exported {}", id);
    println!("  Path: {:?}", target);
    println!("  Size: {} bytes", size);
    Ok(())
}

/// Writes the cached binary of `id` to `out`, or into `out` if it is a
/// directory. Returns the written path and size.
pub async fn export<S: CatalogStore + ?Sized>(
    store: &S,
    id: &str,
    out: &Path,
) -> Result<(PathBuf, usize), Box<dyn std::error::Error>> {
    let entry = store
        .get(id)
        .await?
        .ok_or_else(|| format!("Unknown entry {}", id))?;
    if !entry.state.can_forward() {
        return Err(format!("Entry {} is {}, nothing cached", id, entry.state).into());
    }
    let binary = store
        .get_binary(id)
        .await?
        .ok_or_else(|| format!("Binary of {} is missing", id))?;

    let target = if out.is_dir() {
        out.join(&binary.name)
    } else {
        out.to_path_buf()
    };
    tokio::fs::write(&target, &binary.data).await?;
    Ok((target, binary.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdcstore_protocol::{CachedBinary, DownloadState};
    use xdcstore_storage::InMemoryCatalogStore;
    use xdcstore_testkit::prelude::*;

    #[tokio::test]
    async fn writes_binary_into_directory() {
        let dir = TempStoreDir::new();
        let store =
            InMemoryCatalogStore::with_entries([sample_entry("a", DownloadState::Received)]);
        store
            .put_binary("a", &CachedBinary::new("Poll", vec![7, 8]))
            .await
            .unwrap();

        let (target, size) = export(&store, "a", dir.path()).await.unwrap();
        assert_eq!(target, dir.join("Poll.xdc"));
        assert_eq!(size, 2);
        assert_eq!(std::fs::read(target).unwrap(), vec![7, 8]);
    }

    #[tokio::test]
    async fn refuses_uncached_entries() {
        let dir = TempStoreDir::new();
        let store =
            InMemoryCatalogStore::with_entries([sample_entry("a", DownloadState::Downloading)]);

        assert!(export(&store, "a", &dir.join("out.xdc")).await.is_err());
        assert!(export(&store, "zzz", &dir.join("out.xdc")).await.is_err());
    }
}
