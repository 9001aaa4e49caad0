//! Verify command implementation.

use super::open_stores;
use std::collections::BTreeSet;
use std::path::Path;
use xdcstore_storage::{CatalogStore, StorageError};

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of rows checked.
    pub rows_checked: usize,
    /// Number of binaries checked.
    pub binaries_checked: usize,
    /// Number of cached entries with an intact binary.
    pub valid_binaries: usize,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying catalog at {:?}", path);
    println!();

    let (store, _scalars) = open_stores(path)?;
    let result = verify(&store).await?;

    println!(
        "  Rows checked: {}, binaries checked: {}, intact: {}",
        result.rows_checked, result.binaries_checked, result.valid_binaries
    );
    for error in &result.errors {
        println!("    ERROR: {}", error);
    }

    println!();
    if result.is_ok() {
        println!("✓ Catalog verification passed");
        Ok(())
    } else {
        println!("✗ Catalog verification failed");
        Err("Verification failed".into())
    }
}

/// Checks that exactly the cached entries own a binary and that every
/// binary matches its digest.
pub async fn verify<S: CatalogStore + ?Sized>(store: &S) -> Result<VerifyResult, StorageError> {
    let mut result = VerifyResult::default();
    let rows = store.get_all().await?;
    let binaries: BTreeSet<String> = store.binary_ids().await?.into_iter().collect();
    result.rows_checked = rows.len();

    let mut cached = BTreeSet::new();
    for row in &rows {
        if !row.state.is_cached() {
            if binaries.contains(&row.id) {
                result
                    .errors
                    .push(format!("Entry {} is {} but owns a binary", row.id, row.state));
            }
            continue;
        }
        cached.insert(row.id.clone());
        result.binaries_checked += 1;
        match store.get_binary(&row.id).await {
            Ok(Some(_)) => result.valid_binaries += 1,
            Ok(None) => result
                .errors
                .push(format!("Entry {} is {} but has no binary", row.id, row.state)),
            Err(StorageError::Corrupted(reason)) => result
                .errors
                .push(format!("Binary of {} is corrupt: {}", row.id, reason)),
            Err(err) => return Err(err),
        }
    }

    for id in &binaries {
        if !rows.iter().any(|row| &row.id == id) {
            result.errors.push(format!("Orphan binary {} has no row", id));
        }
    }

    Ok(result)
}
