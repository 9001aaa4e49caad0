//! Host channel messages.

use crate::metadata::{AppMetadata, MetadataPatch};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete catalog as sent on first contact or after lost state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Serial of the host state this snapshot reflects.
    pub serial: u64,
    /// Every item, keyed by id.
    pub entries: BTreeMap<String, AppMetadata>,
    /// Ids for which a newer binary revision exists.
    pub updating: Vec<String>,
}

impl Snapshot {
    /// Creates a snapshot without updating hints.
    pub fn new(serial: u64, entries: impl IntoIterator<Item = (String, AppMetadata)>) -> Self {
        Self {
            serial,
            entries: entries.into_iter().collect(),
            updating: Vec::new(),
        }
    }
}

/// An incremental update relative to `old_serial`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaPatch {
    /// Serial the patch was computed against.
    pub old_serial: u64,
    /// Serial of the host state after the patch.
    pub serial: u64,
    /// Changed items. `None` is the delete sentinel.
    pub changes: BTreeMap<String, Option<MetadataPatch>>,
    /// Ids for which a newer binary revision exists.
    pub updating: Vec<String>,
}

impl DeltaPatch {
    /// Creates an empty patch from `old_serial` to `serial`.
    pub fn new(old_serial: u64, serial: u64) -> Self {
        Self {
            old_serial,
            serial,
            changes: BTreeMap::new(),
            updating: Vec::new(),
        }
    }

    /// Adds a (partial) record for `id`.
    #[must_use]
    pub fn upsert(mut self, id: impl Into<String>, patch: MetadataPatch) -> Self {
        self.changes.insert(id.into(), Some(patch));
        self
    }

    /// Adds a delete sentinel for `id`.
    #[must_use]
    pub fn delete(mut self, id: impl Into<String>) -> Self {
        self.changes.insert(id.into(), None);
        self
    }

    /// Marks `id` as having a newer revision.
    #[must_use]
    pub fn updating(mut self, id: impl Into<String>) -> Self {
        self.updating.push(id.into());
        self
    }
}

/// Severity of an obsolete-client notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObsoleteSeverity {
    /// The client must be upgraded before further use.
    Critical,
    /// An upgrade is available but not required.
    Advisory,
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    /// A complete catalog.
    FullSnapshot(Snapshot),
    /// An incremental catalog update.
    DeltaPatch(DeltaPatch),
    /// A requested binary arrived.
    DownloadSucceeded {
        /// Item id.
        id: String,
        /// Binary payload.
        payload: Bytes,
        /// Display name used to name the cached file.
        name: String,
    },
    /// A requested binary could not be delivered.
    DownloadFailed {
        /// Item id.
        id: String,
        /// Host supplied reason.
        error: String,
    },
    /// The client itself is outdated.
    ObsoleteClientNotice {
        /// Whether the upgrade is mandatory.
        severity: ObsoleteSeverity,
        /// Revision tag of the current client.
        tag_name: String,
    },
    /// The host received a previously sent request.
    UpdateAcknowledged,
    /// Anything else. Dropped without state change.
    Unrecognized,
}

/// Discriminant of a [`HostMessage`], for logging and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// [`HostMessage::FullSnapshot`].
    FullSnapshot,
    /// [`HostMessage::DeltaPatch`].
    DeltaPatch,
    /// [`HostMessage::DownloadSucceeded`].
    DownloadSucceeded,
    /// [`HostMessage::DownloadFailed`].
    DownloadFailed,
    /// [`HostMessage::ObsoleteClientNotice`].
    ObsoleteClientNotice,
    /// [`HostMessage::UpdateAcknowledged`].
    UpdateAcknowledged,
    /// [`HostMessage::Unrecognized`].
    Unrecognized,
}

impl MessageKind {
    /// Returns a stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::FullSnapshot => "full_snapshot",
            MessageKind::DeltaPatch => "delta_patch",
            MessageKind::DownloadSucceeded => "download_succeeded",
            MessageKind::DownloadFailed => "download_failed",
            MessageKind::ObsoleteClientNotice => "obsolete_client",
            MessageKind::UpdateAcknowledged => "update_acknowledged",
            MessageKind::Unrecognized => "unrecognized",
        }
    }
}

impl HostMessage {
    /// Returns the message discriminant.
    pub fn kind(&self) -> MessageKind {
        match self {
            HostMessage::FullSnapshot(_) => MessageKind::FullSnapshot,
            HostMessage::DeltaPatch(_) => MessageKind::DeltaPatch,
            HostMessage::DownloadSucceeded { .. } => MessageKind::DownloadSucceeded,
            HostMessage::DownloadFailed { .. } => MessageKind::DownloadFailed,
            HostMessage::ObsoleteClientNotice { .. } => MessageKind::ObsoleteClientNotice,
            HostMessage::UpdateAcknowledged => MessageKind::UpdateAcknowledged,
            HostMessage::Unrecognized => MessageKind::Unrecognized,
        }
    }

    /// Returns true for messages that carry catalog state.
    pub fn is_catalog_update(&self) -> bool {
        matches!(
            self,
            HostMessage::FullSnapshot(_) | HostMessage::DeltaPatch(_)
        )
    }
}

/// Body of a refresh request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// Last serial merged locally; zero asks for a full snapshot.
    #[serde(rename = "serial")]
    pub last_applied_serial: u64,
    /// Cached items with their revision tags.
    #[serde(rename = "apps")]
    pub cached_items: Vec<(String, String)>,
}

/// An outbound request to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostRequest {
    /// Ask for catalog changes since a serial.
    #[serde(rename = "UpdateRequest")]
    Refresh(RefreshRequest),
    /// Ask for the binary of an item.
    Download {
        /// Item id.
        app_id: String,
    },
    /// Ask for a current build of the client itself.
    #[serde(rename = "UpdateWebxdc")]
    UpgradeClient,
}

impl HostRequest {
    /// Encodes the request into the host's JSON payload shape.
    pub fn to_json(&self) -> serde_json::Value {
        // Serializing these plain structs into a Value cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn refresh_request_wire_shape() {
        let request = HostRequest::Refresh(RefreshRequest {
            last_applied_serial: 7,
            cached_items: vec![("poll".into(), "v1".into())],
        });
        assert_eq!(
            request.to_json(),
            json!({"type": "UpdateRequest", "serial": 7, "apps": [["poll", "v1"]]})
        );
    }

    #[test]
    fn download_and_upgrade_wire_shape() {
        let request = HostRequest::Download {
            app_id: "poll".into(),
        };
        assert_eq!(request.to_json(), json!({"type": "Download", "app_id": "poll"}));
        assert_eq!(
            HostRequest::UpgradeClient.to_json(),
            json!({"type": "UpdateWebxdc"})
        );
    }

    #[test]
    fn delta_builder() {
        let patch = DeltaPatch::new(1, 2)
            .upsert("a", MetadataPatch::default())
            .delete("b")
            .updating("a");
        assert_eq!(patch.changes.len(), 2);
        assert_eq!(patch.changes["b"], None);
        assert_eq!(patch.updating, vec!["a".to_string()]);
    }

    #[test]
    fn message_kinds() {
        assert_eq!(HostMessage::UpdateAcknowledged.kind().as_str(), "update_acknowledged");
        assert!(HostMessage::DeltaPatch(DeltaPatch::new(0, 1)).is_catalog_update());
        assert!(!HostMessage::Unrecognized.is_catalog_update());
    }
}
