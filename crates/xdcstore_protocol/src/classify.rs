//! Update classifier.
//!
//! Turns an opaque inbound payload into exactly one [`HostMessage`]. The
//! decision is structural: the `type` tag plus presence and shape of the
//! accompanying fields. Nothing here touches state or performs I/O.

use crate::error::{ProtocolError, ProtocolResult};
use crate::messages::{DeltaPatch, HostMessage, ObsoleteSeverity, Snapshot};
use crate::metadata::MetadataPatch;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Payload shapes the host is known to send.
#[derive(Deserialize)]
#[serde(tag = "type")]
enum WirePayload {
    Init {
        serial: u64,
        app_infos: WireRecords,
        #[serde(default)]
        updating: Vec<String>,
    },
    Update {
        #[serde(default)]
        old_serial: u64,
        serial: u64,
        app_infos: WireRecords,
        #[serde(default)]
        updating: Vec<String>,
    },
    DownloadOkay {
        app_id: String,
        name: String,
        data: String,
    },
    DownloadError {
        app_id: String,
        #[serde(default)]
        error: String,
    },
    Outdated {
        critical: bool,
        #[serde(default)]
        tag_name: String,
    },
    UpdateSent,
}

/// Records arrive either as a list of full items or keyed by id.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireRecords {
    List(Vec<WireRecord>),
    ById(BTreeMap<String, Option<MetadataPatch>>),
}

#[derive(Deserialize)]
struct WireRecord {
    app_id: String,
    #[serde(flatten)]
    patch: MetadataPatch,
}

impl WireRecords {
    fn into_changes(self) -> BTreeMap<String, Option<MetadataPatch>> {
        match self {
            WireRecords::List(records) => records
                .into_iter()
                .map(|record| (record.app_id, Some(record.patch)))
                .collect(),
            WireRecords::ById(changes) => changes,
        }
    }
}

/// Classifies an inbound payload, dropping the reason for rejection.
///
/// Never fails: anything that does not match a known shape yields
/// [`HostMessage::Unrecognized`].
pub fn classify(raw: &Value) -> HostMessage {
    classify_with_reason(raw).unwrap_or(HostMessage::Unrecognized)
}

/// Classifies an inbound payload, explaining why it was not recognised.
///
/// # Errors
///
/// Returns a [`ProtocolError`] if the payload has an unknown tag, lacks
/// fields, carries an undecodable binary, or is a snapshot with
/// incomplete records.
pub fn classify_with_reason(raw: &Value) -> ProtocolResult<HostMessage> {
    let payload =
        WirePayload::deserialize(raw).map_err(|e| ProtocolError::malformed(e.to_string()))?;

    match payload {
        WirePayload::Init {
            serial,
            app_infos,
            updating,
        } => snapshot(serial, app_infos, updating),
        WirePayload::Update {
            old_serial: 0,
            serial,
            app_infos,
            updating,
        } => snapshot(serial, app_infos, updating),
        WirePayload::Update {
            old_serial,
            serial,
            app_infos,
            updating,
        } => {
            if serial <= old_serial {
                return Err(ProtocolError::invalid_field(
                    "serial",
                    format!("serial {serial} does not follow old_serial {old_serial}"),
                ));
            }
            Ok(HostMessage::DeltaPatch(DeltaPatch {
                old_serial,
                serial,
                changes: app_infos.into_changes(),
                updating,
            }))
        }
        WirePayload::DownloadOkay { app_id, name, data } => {
            let payload = STANDARD
                .decode(data.as_bytes())
                .map_err(|e| ProtocolError::invalid_field("data", e.to_string()))?;
            Ok(HostMessage::DownloadSucceeded {
                id: app_id,
                payload: Bytes::from(payload),
                name,
            })
        }
        WirePayload::DownloadError { app_id, error } => Ok(HostMessage::DownloadFailed {
            id: app_id,
            error,
        }),
        WirePayload::Outdated { critical, tag_name } => Ok(HostMessage::ObsoleteClientNotice {
            severity: if critical {
                ObsoleteSeverity::Critical
            } else {
                ObsoleteSeverity::Advisory
            },
            tag_name,
        }),
        WirePayload::UpdateSent => Ok(HostMessage::UpdateAcknowledged),
    }
}

/// Returns true if `raw` is tagged as a catalog snapshot or patch,
/// whether or not it is well formed.
pub fn is_catalog_payload(raw: &Value) -> bool {
    matches!(
        raw.get("type").and_then(Value::as_str),
        Some("Init" | "Update")
    )
}

/// Builds a snapshot, requiring every record to be complete.
fn snapshot(serial: u64, records: WireRecords, updating: Vec<String>) -> ProtocolResult<HostMessage> {
    let mut entries = BTreeMap::new();
    for (id, patch) in records.into_changes() {
        let patch = patch.ok_or_else(|| {
            ProtocolError::malformed(format!("snapshot carries delete sentinel for `{id}`"))
        })?;
        let metadata = patch.into_complete(&id)?;
        entries.insert(id, metadata);
    }

    Ok(HostMessage::FullSnapshot(Snapshot {
        serial,
        entries,
        updating,
    }))
}
