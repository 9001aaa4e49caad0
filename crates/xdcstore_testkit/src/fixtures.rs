//! Sample catalog data and host payload builders.
//!
//! Payload builders produce the JSON shapes the host sends, so tests can
//! drive a client through its public `handle_raw` entry point.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use xdcstore_protocol::{AppMetadata, CatalogEntry, DownloadState, MetadataPatch};

/// Returns complete, deterministic metadata for `id`.
pub fn sample_metadata(id: &str) -> AppMetadata {
    AppMetadata {
        name: format!("{id} app"),
        description: format!("Description of {id}"),
        author_name: "Test Author".into(),
        author_email: "author@example.org".into(),
        source_code_url: format!("https://example.org/{id}"),
        image: None,
        tag_name: "v1.0.0".into(),
        size: 1024,
        date: 1_700_000_000,
    }
}

/// Returns a sample entry for `id` in `state`.
pub fn sample_entry(id: &str, state: DownloadState) -> CatalogEntry {
    CatalogEntry::new(id, sample_metadata(id)).with_state(state)
}

/// Returns the wire record for `id` as found in `app_infos` lists.
pub fn app_info_json(id: &str) -> Value {
    let mut record = match serde_json::to_value(sample_metadata(id)) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    record.insert("app_id".into(), json!(id));
    Value::Object(record)
}

/// Builds an `Init` payload listing `ids`.
pub fn init_json(serial: u64, ids: &[&str]) -> Value {
    json!({
        "type": "Init",
        "serial": serial,
        "app_infos": ids.iter().map(|id| app_info_json(id)).collect::<Vec<_>>(),
    })
}

/// Builder for `Update` payloads.
#[derive(Debug, Clone)]
pub struct UpdateJson {
    old_serial: u64,
    serial: u64,
    app_infos: Map<String, Value>,
    updating: Vec<String>,
}

impl UpdateJson {
    /// Starts an update from `old_serial` to `serial`.
    pub fn new(old_serial: u64, serial: u64) -> Self {
        Self {
            old_serial,
            serial,
            app_infos: Map::new(),
            updating: Vec::new(),
        }
    }

    /// Adds a complete record for `id`.
    pub fn add(mut self, id: &str) -> Self {
        let record = MetadataPatch::from(sample_metadata(id));
        self.app_infos
            .insert(id.into(), serde_json::to_value(record).unwrap_or(Value::Null));
        self
    }

    /// Adds a partial record for `id`.
    pub fn patch(mut self, id: &str, fields: Value) -> Self {
        self.app_infos.insert(id.into(), fields);
        self
    }

    /// Adds a delete sentinel for `id`.
    pub fn delete(mut self, id: &str) -> Self {
        self.app_infos.insert(id.into(), Value::Null);
        self
    }

    /// Marks `id` as having a newer revision.
    pub fn updating(mut self, id: &str) -> Self {
        self.updating.push(id.into());
        self
    }

    /// Produces the payload.
    pub fn build(self) -> Value {
        json!({
            "type": "Update",
            "old_serial": self.old_serial,
            "serial": self.serial,
            "app_infos": self.app_infos,
            "updating": self.updating,
        })
    }
}

/// Builds a `DownloadOkay` payload.
pub fn download_okay_json(id: &str, name: &str, data: &[u8]) -> Value {
    json!({
        "type": "DownloadOkay",
        "app_id": id,
        "name": name,
        "data": STANDARD.encode(data),
    })
}

/// Builds a `DownloadError` payload.
pub fn download_error_json(id: &str, error: &str) -> Value {
    json!({"type": "DownloadError", "app_id": id, "error": error})
}

/// Builds an `Outdated` payload.
pub fn outdated_json(critical: bool, tag_name: &str) -> Value {
    json!({"type": "Outdated", "critical": critical, "tag_name": tag_name})
}

/// Builds an `UpdateSent` payload.
pub fn update_sent_json() -> Value {
    json!({"type": "UpdateSent"})
}

/// A temporary directory for file-backed stores, removed on drop.
pub struct TempStoreDir {
    dir: TempDir,
}

impl TempStoreDir {
    /// Creates a fresh directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns a path inside the directory.
    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Default for TempStoreDir {
    fn default() -> Self {
        Self::new()
    }
}
