//! Inspect command implementation.

use super::open_stores;
use serde::Serialize;
use std::path::Path;
use std::time::UNIX_EPOCH;
use xdcstore_engine::{ClientFlags, SyncCursor};
use xdcstore_protocol::CatalogEntry;
use xdcstore_storage::{CatalogStore, FileCatalogStore, FileScalarStore};

/// Catalog directory inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Catalog directory path.
    pub path: String,
    /// Last merged serial.
    pub serial: u64,
    /// Seconds since the epoch of the last refresh, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<u64>,
    /// Pending client update, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_needed: Option<String>,
    /// Whether the host acknowledged an upgrade request.
    pub update_acknowledged: bool,
    /// Entries in id order.
    pub entries: Vec<EntryInfo>,
}

/// One row of the listing.
#[derive(Debug, Serialize)]
pub struct EntryInfo {
    /// Entry id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Revision tag.
    pub tag_name: String,
    /// Download state.
    pub state: String,
    /// Published size in bytes.
    pub size: u64,
}

impl From<&CatalogEntry> for EntryInfo {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.metadata.name.clone(),
            tag_name: entry.metadata.tag_name.clone(),
            state: entry.state.to_string(),
            size: entry.metadata.size,
        }
    }
}

/// Runs the inspect command.
pub async fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (store, scalars) = open_stores(path)?;
    let result = inspect(path, &store, &scalars).await?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Collects the listing from the stores.
pub async fn inspect(
    path: &Path,
    store: &FileCatalogStore,
    scalars: &FileScalarStore,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let mut rows = store.get_all().await?;
    rows.sort_by(|a, b| a.id.cmp(&b.id));
    let cursor = SyncCursor::load(scalars).await?;
    let flags = ClientFlags::load(scalars).await?;

    Ok(InspectResult {
        path: path.display().to_string(),
        serial: cursor.last_applied_serial,
        last_refresh: (!cursor.is_initial())
            .then(|| cursor.last_refresh.duration_since(UNIX_EPOCH).ok())
            .flatten()
            .map(|d| d.as_secs()),
        update_needed: flags.update_needed.map(|s| format!("{s:?}")),
        update_acknowledged: flags.update_acknowledged,
        entries: rows.iter().map(EntryInfo::from).collect(),
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Catalog: {}", result.path);
    println!("Serial: {}", result.serial);
    if let Some(secs) = result.last_refresh {
        println!("Last refresh: {} (unix seconds)", secs);
    }
    match &result.update_needed {
        Some(severity) => println!(
            "Client update: {} (acknowledged: {})",
            severity, result.update_acknowledged
        ),
        None => println!("Client update: none"),
    }
    println!();
    println!("Entries: {}", result.entries.len());
    for entry in &result.entries {
        println!(
            "  {:<24} {:<12} {:<10} {:>10}  {}",
            entry.id, entry.state, entry.tag_name, entry.size, entry.name
        );
    }
}
