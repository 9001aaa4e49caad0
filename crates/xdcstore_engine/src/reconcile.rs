//! Reconciliation engine.
//!
//! Planning is pure: every function here takes the current catalog and
//! cursor and returns a [`Reconciliation`] describing the next catalog, the
//! next cursor and the exact store operations that make the store agree.
//! The client executes the effects and commits the plan only when they
//! succeed.
//!
//! # Storage effects
//!
//! - `added`: ids absent before the message, written with `insert_many`
//! - `updated`: existing ids carried by the message or whose state changed,
//!   written with `update_many`
//! - `removed`: existing ids dropped by the message, deleted together with
//!   their binaries
//!
//! The three sets are disjoint.

use crate::catalog::Catalog;
use crate::config::RetryConfig;
use crate::coordinator::{RefreshTrigger, SyncCursor};
use crate::download::{transition, DownloadEvent};
use crate::error::{EngineError, EngineResult};
use crate::feed::CatalogChange;
use crate::retry::with_retry;
use bytes::Bytes;
use std::collections::BTreeSet;
use std::fmt;
use std::time::SystemTime;
use tracing::debug;
use xdcstore_protocol::{
    CachedBinary, CatalogEntry, DeltaPatch, DownloadState, HostMessage, Snapshot,
};
use xdcstore_storage::{CatalogStore, StorageResult};

/// Store operations needed to persist a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageEffects {
    /// Rows for ids that were not known before.
    pub added: Vec<CatalogEntry>,
    /// Rows for known ids that changed.
    pub updated: Vec<CatalogEntry>,
    /// Ids whose rows and binaries are deleted.
    pub removed: Vec<String>,
    /// Binaries to write.
    pub binaries_written: Vec<(String, CachedBinary)>,
    /// Binaries to delete for ids that stay in the catalog.
    pub binaries_dropped: Vec<String>,
}

impl StorageEffects {
    /// Returns true if no store operation is needed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.binaries_written.is_empty()
            && self.binaries_dropped.is_empty()
    }

    /// Ids written with `insert_many`.
    pub fn added_ids(&self) -> Vec<&str> {
        self.added.iter().map(|e| e.id.as_str()).collect()
    }

    /// Ids written with `update_many`.
    pub fn updated_ids(&self) -> Vec<&str> {
        self.updated.iter().map(|e| e.id.as_str()).collect()
    }

    /// Runs the effects against `store`.
    ///
    /// Binaries are written before rows so that a row claiming a cached
    /// binary never precedes it. Empty batches issue no call.
    ///
    /// # Errors
    ///
    /// Returns the first store error once retries are exhausted. Effects
    /// already executed are not rolled back.
    pub async fn execute<S: CatalogStore + ?Sized>(
        &self,
        store: &S,
        retry: &RetryConfig,
    ) -> StorageResult<()> {
        for (id, binary) in &self.binaries_written {
            with_retry(retry, "put_binary", || store.put_binary(id, binary)).await?;
        }
        if !self.added.is_empty() {
            with_retry(retry, "insert_many", || store.insert_many(&self.added)).await?;
        }
        if !self.updated.is_empty() {
            with_retry(retry, "update_many", || store.update_many(&self.updated)).await?;
        }
        if !self.removed.is_empty() {
            with_retry(retry, "delete_many", || store.delete_many(&self.removed)).await?;
        }
        for id in self.removed.iter().chain(&self.binaries_dropped) {
            with_retry(retry, "delete_binary", || store.delete_binary(id)).await?;
        }
        Ok(())
    }
}

/// The outcome of planning one message or intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Catalog after the change.
    pub catalog: Catalog,
    /// Cursor after the change.
    pub cursor: SyncCursor,
    /// Store operations to execute before committing.
    pub effects: StorageEffects,
    /// Observable changes, for the change feed.
    pub changes: Vec<CatalogChange>,
    /// True if this came from a full snapshot.
    pub full_snapshot: bool,
}

/// Why a catalog update was discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The patch was computed against a different serial.
    SerialMismatch {
        /// Local cursor serial.
        expected: u64,
        /// The patch's `old_serial`.
        received: u64,
    },
    /// A patch introduced an unknown id without a complete record.
    IncompleteRecord {
        /// Item id.
        id: String,
        /// Required fields the record lacks.
        missing: Vec<&'static str>,
    },
    /// A snapshot or patch failed structural validation.
    Malformed {
        /// Why the payload was not accepted.
        reason: String,
    },
}

impl RejectReason {
    /// Returns the refresh trigger this rejection raises.
    pub fn trigger(&self) -> RefreshTrigger {
        match self {
            RejectReason::SerialMismatch { .. } => RefreshTrigger::SerialMismatch,
            RejectReason::IncompleteRecord { .. } => RefreshTrigger::IncompleteRecord,
            RejectReason::Malformed { .. } => RefreshTrigger::MalformedUpdate,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::SerialMismatch { expected, received } => {
                write!(f, "patch from serial {received} does not follow local serial {expected}")
            }
            RejectReason::IncompleteRecord { id, missing } => {
                write!(f, "first record for {id} lacks {}", missing.join(", "))
            }
            RejectReason::Malformed { reason } => write!(f, "malformed catalog update: {reason}"),
        }
    }
}

/// Plans any catalog-affecting message.
///
/// `stored` is the store's current content; it is only consulted for full
/// snapshots. Returns `Ok(None)` for messages that do not touch the
/// catalog and for downloads of unknown ids.
///
/// # Errors
///
/// Returns a [`RejectReason`] if a delta patch is not admissible.
pub fn apply(
    message: &HostMessage,
    current: &Catalog,
    cursor: &SyncCursor,
    stored: &Catalog,
    now: SystemTime,
) -> Result<Option<Reconciliation>, RejectReason> {
    match message {
        HostMessage::FullSnapshot(snapshot) => Ok(Some(apply_snapshot(snapshot, current, stored, now))),
        HostMessage::DeltaPatch(patch) => apply_delta(patch, current, cursor, now).map(Some),
        HostMessage::DownloadSucceeded { id, payload, name } => {
            Ok(apply_download_succeeded(current, cursor, id, payload, name).ok())
        }
        HostMessage::DownloadFailed { id, .. } => Ok(apply_download_failed(current, cursor, id).ok()),
        HostMessage::ObsoleteClientNotice { .. }
        | HostMessage::UpdateAcknowledged
        | HostMessage::Unrecognized => Ok(None),
    }
}

/// Plans a full snapshot.
///
/// The result is computed against `stored` so that the store converges
/// even if it drifted from `current`. Non-initial states already stored
/// are kept, except a `Downloading` row this session never requested,
/// which settles to `DownloadCancelled`.
pub fn apply_snapshot(
    snapshot: &Snapshot,
    current: &Catalog,
    stored: &Catalog,
    now: SystemTime,
) -> Reconciliation {
    let mut catalog = Catalog::new();
    let mut added = BTreeSet::new();
    let mut updated = BTreeSet::new();

    for (id, metadata) in &snapshot.entries {
        let state = match stored.get(id) {
            Some(row) => {
                updated.insert(id.clone());
                settled_state(row.state, current.get(id).map(|e| e.state))
            }
            None => {
                added.insert(id.clone());
                DownloadState::Initial
            }
        };
        catalog.insert(CatalogEntry::new(id.clone(), metadata.clone()).with_state(state));
    }
    force_updating(&mut catalog, &snapshot.updating, &added, &mut updated);

    let removed = stored
        .iter()
        .filter(|row| !snapshot.entries.contains_key(&row.id))
        .map(|row| row.id.clone())
        .collect();

    let cursor = SyncCursor::at(snapshot.serial, now);
    finish(current, catalog, cursor, &added, &updated, removed, true)
}

/// Plans a delta patch.
///
/// # Errors
///
/// Returns [`RejectReason::SerialMismatch`] unless `old_serial` equals the
/// cursor serial, and [`RejectReason::IncompleteRecord`] if an unknown id
/// arrives without a complete record.
pub fn apply_delta(
    patch: &DeltaPatch,
    current: &Catalog,
    cursor: &SyncCursor,
    now: SystemTime,
) -> Result<Reconciliation, RejectReason> {
    if patch.old_serial != cursor.last_applied_serial {
        return Err(RejectReason::SerialMismatch {
            expected: cursor.last_applied_serial,
            received: patch.old_serial,
        });
    }

    let mut catalog = current.clone();
    let mut added = BTreeSet::new();
    let mut updated = BTreeSet::new();
    let mut removed = Vec::new();

    for (id, change) in &patch.changes {
        match change {
            None => {
                if catalog.remove(id).is_some() {
                    removed.push(id.clone());
                } else {
                    debug!(%id, "delete for unknown entry ignored");
                }
            }
            Some(fields) => match catalog.get_mut(id) {
                Some(entry) => {
                    entry.metadata.apply(fields);
                    updated.insert(id.clone());
                }
                None => {
                    let metadata = fields.clone().into_complete(id).map_err(|_| {
                        RejectReason::IncompleteRecord {
                            id: id.clone(),
                            missing: fields.missing_fields(),
                        }
                    })?;
                    catalog.insert(CatalogEntry::new(id.clone(), metadata));
                    added.insert(id.clone());
                }
            },
        }
    }
    force_updating(&mut catalog, &patch.updating, &added, &mut updated);

    let cursor = SyncCursor::at(patch.serial, now);
    Ok(finish(current, catalog, cursor, &added, &updated, removed, false))
}

/// Plans the arrival of a binary.
///
/// # Errors
///
/// Returns [`EngineError::UnknownEntry`] if `id` is not in the catalog.
pub fn apply_download_succeeded(
    current: &Catalog,
    cursor: &SyncCursor,
    id: &str,
    payload: &Bytes,
    name: &str,
) -> EngineResult<Reconciliation> {
    let binary = CachedBinary::new(name, payload.clone());
    apply_event(current, cursor, id, DownloadEvent::Delivered, Some(binary))
}

/// Plans a failed download.
///
/// # Errors
///
/// Returns [`EngineError::UnknownEntry`] if `id` is not in the catalog.
pub fn apply_download_failed(
    current: &Catalog,
    cursor: &SyncCursor,
    id: &str,
) -> EngineResult<Reconciliation> {
    apply_event(current, cursor, id, DownloadEvent::Failed, None)
}

/// Plans a single-entry state transition.
///
/// `binary` is written when the event delivers one. A binary is dropped
/// when the entry leaves a cached state without a new one.
///
/// # Errors
///
/// Returns [`EngineError::UnknownEntry`] for unknown ids and
/// [`EngineError::InvalidTransition`] if the event is not valid.
pub fn apply_event(
    current: &Catalog,
    cursor: &SyncCursor,
    id: &str,
    event: DownloadEvent,
    binary: Option<CachedBinary>,
) -> EngineResult<Reconciliation> {
    let entry = current
        .get(id)
        .ok_or_else(|| EngineError::UnknownEntry(id.to_string()))?;
    let from = entry.state;
    let to = transition(from, event).ok_or_else(|| EngineError::InvalidTransition {
        id: id.to_string(),
        from,
        event,
    })?;

    let mut effects = StorageEffects::default();
    let mut catalog = current.clone();
    let mut changes = Vec::new();

    if let Some(binary) = binary {
        effects.binaries_written.push((id.to_string(), binary));
    } else if from.is_cached() && !to.is_cached() {
        effects.binaries_dropped.push(id.to_string());
    }

    if to != from || !effects.binaries_written.is_empty() {
        let next = entry.clone().with_state(to);
        effects.updated.push(next.clone());
        catalog.insert(next);
        changes.push(CatalogChange::StateChanged {
            id: id.to_string(),
            state: to,
        });
    }

    debug!(%id, %from, %to, ?event, "planned state transition");
    Ok(Reconciliation {
        catalog,
        cursor: *cursor,
        effects,
        changes,
        full_snapshot: false,
    })
}

/// Picks the state a snapshot keeps for a stored row.
///
/// A stored `Downloading` survives only while this session still has the
/// request outstanding.
fn settled_state(stored: DownloadState, in_memory: Option<DownloadState>) -> DownloadState {
    if in_memory == Some(DownloadState::Downloading) {
        return stored;
    }
    transition(stored, DownloadEvent::Interrupted).unwrap_or(stored)
}

/// Moves cached entries named in `ids` to `Updating`.
fn force_updating(
    catalog: &mut Catalog,
    ids: &[String],
    added: &BTreeSet<String>,
    updated: &mut BTreeSet<String>,
) {
    for id in ids {
        let Some(entry) = catalog.get_mut(id) else {
            debug!(%id, "updating hint for unknown entry ignored");
            continue;
        };
        let next = transition(entry.state, DownloadEvent::NewerRevision).unwrap_or(entry.state);
        if next != entry.state {
            entry.state = next;
            if !added.contains(id) {
                updated.insert(id.clone());
            }
        }
    }
}

/// Assembles effects and feed changes for a catalog-wide plan.
fn finish(
    current: &Catalog,
    catalog: Catalog,
    cursor: SyncCursor,
    added: &BTreeSet<String>,
    updated: &BTreeSet<String>,
    removed: Vec<String>,
    full_snapshot: bool,
) -> Reconciliation {
    let rows = |ids: &BTreeSet<String>| -> Vec<CatalogEntry> {
        ids.iter().filter_map(|id| catalog.get(id).cloned()).collect()
    };
    let effects = StorageEffects {
        added: rows(added),
        updated: rows(updated),
        removed,
        binaries_written: Vec::new(),
        binaries_dropped: Vec::new(),
    };

    let mut changes = diff(current, &catalog);
    changes.push(CatalogChange::CursorAdvanced(cursor.last_applied_serial));

    Reconciliation {
        catalog,
        cursor,
        effects,
        changes,
        full_snapshot,
    }
}

/// Lists the observable differences between two catalogs.
fn diff(old: &Catalog, new: &Catalog) -> Vec<CatalogChange> {
    let mut changes = Vec::new();
    for entry in new.iter() {
        match old.get(&entry.id) {
            None => changes.push(CatalogChange::Added(entry.id.clone())),
            Some(prev) if prev.metadata != entry.metadata => {
                changes.push(CatalogChange::Updated(entry.id.clone()));
            }
            Some(prev) if prev.state != entry.state => changes.push(CatalogChange::StateChanged {
                id: entry.id.clone(),
                state: entry.state,
            }),
            Some(_) => {}
        }
    }
    for entry in old.iter() {
        if !new.contains(&entry.id) {
            changes.push(CatalogChange::Removed(entry.id.clone()));
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdcstore_protocol::{AppMetadata, MetadataPatch};

    fn metadata(name: &str) -> AppMetadata {
        AppMetadata {
            name: name.into(),
            description: format!("{name} app"),
            author_name: "author".into(),
            author_email: "author@example.org".into(),
            source_code_url: format!("https://example.org/{name}"),
            image: None,
            tag_name: "v1".into(),
            size: 100,
            date: 1_700_000_000,
        }
    }

    fn entry(id: &str, state: DownloadState) -> CatalogEntry {
        CatalogEntry::new(id, metadata(id)).with_state(state)
    }

    fn catalog(entries: &[(&str, DownloadState)]) -> Catalog {
        entries.iter().map(|(id, s)| entry(id, *s)).collect()
    }

    fn snapshot(serial: u64, ids: &[&str]) -> Snapshot {
        Snapshot::new(serial, ids.iter().map(|id| (id.to_string(), metadata(id))))
    }

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000)
    }

    #[test]
    fn cold_snapshot_is_one_insert_batch() {
        let plan = apply_snapshot(&snapshot(1, &["a", "b"]), &Catalog::new(), &Catalog::new(), now());

        assert_eq!(plan.effects.added_ids(), ["a", "b"]);
        assert!(plan.effects.updated.is_empty());
        assert!(plan.effects.removed.is_empty());
        assert!(plan.catalog.iter().all(|e| e.state == DownloadState::Initial));
        assert_eq!(plan.cursor, SyncCursor::at(1, now()));
        assert!(plan.full_snapshot);
    }

    #[test]
    fn snapshot_preserves_stored_states_and_removes_missing() {
        let stored = catalog(&[
            ("a", DownloadState::Received),
            ("b", DownloadState::Initial),
            ("gone", DownloadState::Received),
        ]);
        let plan = apply_snapshot(&snapshot(5, &["a", "b", "c"]), &stored, &stored, now());

        assert_eq!(plan.effects.added_ids(), ["c"]);
        assert_eq!(plan.effects.updated_ids(), ["a", "b"]);
        assert_eq!(plan.effects.removed, vec!["gone".to_string()]);
        assert_eq!(plan.catalog.get("a").unwrap().state, DownloadState::Received);
        assert!(!plan.catalog.contains("gone"));
        assert!(plan.changes.contains(&CatalogChange::Removed("gone".into())));
    }

    #[test]
    fn snapshot_is_computed_against_stored_rows() {
        // The in-memory view lost "a" but the store still has it.
        let stored = catalog(&[("a", DownloadState::Received)]);
        let plan = apply_snapshot(&snapshot(2, &["a"]), &Catalog::new(), &stored, now());

        assert!(plan.effects.added.is_empty());
        assert_eq!(plan.effects.updated_ids(), ["a"]);
        assert_eq!(plan.changes[0], CatalogChange::Added("a".into()));
    }

    #[test]
    fn snapshot_settles_orphaned_downloads() {
        let stored = catalog(&[
            ("stale", DownloadState::Downloading),
            ("live", DownloadState::Downloading),
        ]);
        let current = catalog(&[("live", DownloadState::Downloading)]);
        let plan = apply_snapshot(&snapshot(6, &["stale", "live"]), &current, &stored, now());

        assert_eq!(
            plan.catalog.get("stale").unwrap().state,
            DownloadState::DownloadCancelled
        );
        assert_eq!(plan.catalog.get("live").unwrap().state, DownloadState::Downloading);
        assert_eq!(plan.effects.updated_ids(), ["live", "stale"]);
        assert_eq!(
            plan.effects.updated[1].state,
            DownloadState::DownloadCancelled
        );
    }

    #[test]
    fn snapshot_updating_hint() {
        let stored = catalog(&[("a", DownloadState::Received), ("b", DownloadState::Initial)]);
        let mut snap = snapshot(3, &["a", "b"]);
        snap.updating = vec!["a".into(), "b".into()];
        let plan = apply_snapshot(&snap, &stored, &stored, now());

        assert_eq!(plan.catalog.get("a").unwrap().state, DownloadState::Updating);
        assert_eq!(plan.catalog.get("b").unwrap().state, DownloadState::Initial);
    }

    #[test]
    fn delta_serial_gating_is_strict() {
        let current = catalog(&[("a", DownloadState::Initial)]);
        let cursor = SyncCursor::at(4, now());

        for old in [3, 5] {
            let patch = DeltaPatch::new(old, 6).delete("a");
            assert_eq!(
                apply_delta(&patch, &current, &cursor, now()),
                Err(RejectReason::SerialMismatch {
                    expected: 4,
                    received: old
                })
            );
        }
    }

    #[test]
    fn delta_three_way_split() {
        let current = catalog(&[
            ("keep", DownloadState::Initial),
            ("edit", DownloadState::Received),
            ("drop", DownloadState::Received),
            ("cached", DownloadState::Received),
        ]);
        let patch = DeltaPatch::new(1, 2)
            .upsert(
                "edit",
                MetadataPatch {
                    description: Some("x".into()),
                    ..Default::default()
                },
            )
            .upsert("new", MetadataPatch::from(metadata("new")))
            .delete("drop")
            .delete("never")
            .updating("cached")
            .updating("new");

        let plan = apply_delta(&patch, &current, &SyncCursor::at(1, now()), now()).unwrap();

        assert_eq!(plan.effects.added_ids(), ["new"]);
        assert_eq!(plan.effects.updated_ids(), ["cached", "edit"]);
        assert_eq!(plan.effects.removed, vec!["drop".to_string()]);

        let edit = plan.catalog.get("edit").unwrap();
        assert_eq!(edit.metadata.description, "x");
        assert_eq!(edit.metadata.name, "edit");
        assert_eq!(edit.state, DownloadState::Received);
        assert_eq!(plan.catalog.get("cached").unwrap().state, DownloadState::Updating);
        assert_eq!(plan.catalog.get("new").unwrap().state, DownloadState::Initial);
        assert_eq!(plan.cursor.last_applied_serial, 2);
        assert!(!plan.full_snapshot);
    }

    #[test]
    fn delete_of_unknown_id_is_noop() {
        let current = catalog(&[("b", DownloadState::Initial)]);
        let patch = DeltaPatch::new(1, 2).delete("a");
        let plan = apply_delta(&patch, &current, &SyncCursor::at(1, now()), now()).unwrap();

        assert!(plan.effects.is_empty());
        assert_eq!(plan.catalog, current);
        assert_eq!(plan.cursor.last_applied_serial, 2);
    }

    #[test]
    fn incomplete_first_sight_rejects_patch() {
        let patch = DeltaPatch::new(1, 2).upsert(
            "new",
            MetadataPatch {
                name: Some("New".into()),
                ..Default::default()
            },
        );
        let err = apply_delta(&patch, &Catalog::new(), &SyncCursor::at(1, now()), now()).unwrap_err();
        assert!(matches!(
            &err,
            RejectReason::IncompleteRecord { id, missing } if id == "new" && missing.contains(&"tag_name")
        ));
        assert_eq!(err.trigger(), RefreshTrigger::IncompleteRecord);
    }

    #[test]
    fn malformed_updates_demand_full_snapshot() {
        let reason = RejectReason::Malformed {
            reason: "serial 1 does not follow old_serial 1".into(),
        };
        assert!(reason.trigger().requires_full_snapshot());
        assert!(reason.to_string().starts_with("malformed catalog update"));
    }

    #[test]
    fn download_success_writes_binary() {
        let current = catalog(&[("a", DownloadState::Downloading)]);
        let plan = apply_download_succeeded(
            &current,
            &SyncCursor::INITIAL,
            "a",
            &Bytes::from_static(b"zip"),
            "A",
        )
        .unwrap();

        assert_eq!(plan.catalog.get("a").unwrap().state, DownloadState::Received);
        assert_eq!(plan.effects.binaries_written.len(), 1);
        assert_eq!(plan.effects.binaries_written[0].1.name, "A.xdc");
        assert_eq!(plan.effects.updated_ids(), ["a"]);
    }

    #[test]
    fn redelivery_on_received_still_overwrites() {
        let current = catalog(&[("a", DownloadState::Received)]);
        let plan = apply_download_succeeded(
            &current,
            &SyncCursor::INITIAL,
            "a",
            &Bytes::from_static(b"v2"),
            "A",
        )
        .unwrap();
        assert_eq!(plan.effects.binaries_written.len(), 1);
        assert_eq!(plan.effects.updated_ids(), ["a"]);
    }

    #[test]
    fn failure_on_cached_entry_drops_binary() {
        let current = catalog(&[("a", DownloadState::Updating), ("b", DownloadState::Downloading)]);
        let plan = apply_download_failed(&current, &SyncCursor::INITIAL, "a").unwrap();
        assert_eq!(plan.effects.binaries_dropped, vec!["a".to_string()]);

        let plan = apply_download_failed(&current, &SyncCursor::INITIAL, "b").unwrap();
        assert!(plan.effects.binaries_dropped.is_empty());
        assert_eq!(
            plan.catalog.get("b").unwrap().state,
            DownloadState::DownloadCancelled
        );
    }

    #[test]
    fn download_for_unknown_id_is_skipped() {
        let message = HostMessage::DownloadSucceeded {
            id: "x".into(),
            payload: Bytes::new(),
            name: "X".into(),
        };
        let plan = apply(&message, &Catalog::new(), &SyncCursor::INITIAL, &Catalog::new(), now());
        assert_eq!(plan, Ok(None));
    }

    #[test]
    fn invalid_user_transition() {
        let current = catalog(&[("a", DownloadState::Initial)]);
        let err = apply_event(&current, &SyncCursor::INITIAL, "a", DownloadEvent::UserRemoved, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn execute_skips_empty_batches() {
        let store = xdcstore_storage::InMemoryCatalogStore::with_entries([entry(
            "a",
            DownloadState::Received,
        )]);
        let effects = StorageEffects {
            removed: vec!["a".into()],
            ..Default::default()
        };
        effects.execute(&store, &RetryConfig::no_retry()).await.unwrap();
        assert!(store.is_empty());
        assert!(StorageEffects::default().is_empty());
    }
}
