//! Sync coordinator.
//!
//! Owns the [`SyncCursor`] and decides when to ask the host for catalog
//! changes. At most one refresh is outstanding; triggers that arrive while
//! one is in flight are coalesced into it.

use crate::catalog::Catalog;
use crate::error::EngineResult;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};
use xdcstore_protocol::RefreshRequest;
use xdcstore_storage::{load_value, store_value, ScalarStore};

const CURSOR_KEY: &str = "sync_cursor";

/// Process-wide synchronization progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    /// Serial of the last merged catalog update.
    pub last_applied_serial: u64,
    /// When the catalog last advanced.
    pub last_refresh: SystemTime,
}

impl SyncCursor {
    /// The cursor of a client that never merged anything.
    pub const INITIAL: SyncCursor = SyncCursor {
        last_applied_serial: 0,
        last_refresh: SystemTime::UNIX_EPOCH,
    };

    /// Returns a cursor at `serial`, refreshed at `now`.
    pub fn at(serial: u64, now: SystemTime) -> Self {
        Self {
            last_applied_serial: serial,
            last_refresh: now,
        }
    }

    /// Returns true if nothing was ever applied.
    pub fn is_initial(&self) -> bool {
        self.last_applied_serial == 0
    }

    /// Returns the time since the last refresh. Clock skew counts as zero.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.last_refresh).unwrap_or_default()
    }

    /// Loads the persisted cursor, or [`SyncCursor::INITIAL`] on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value cannot be read or decoded.
    pub async fn load<K: ScalarStore + ?Sized>(scalars: &K) -> EngineResult<Self> {
        Ok(load_value(scalars, CURSOR_KEY)
            .await?
            .unwrap_or(Self::INITIAL))
    }

    /// Persists this cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    pub async fn save<K: ScalarStore + ?Sized>(&self, scalars: &K) -> EngineResult<()> {
        store_value(scalars, CURSOR_KEY, self).await?;
        Ok(())
    }
}

impl Default for SyncCursor {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Why a refresh was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// The last refresh is older than the staleness threshold.
    Stale,
    /// The user asked for a refresh.
    Explicit,
    /// A delta patch did not follow the local cursor.
    SerialMismatch,
    /// A patch introduced an item without a complete record.
    IncompleteRecord,
    /// A snapshot or patch failed validation.
    MalformedUpdate,
    /// A store write failed and local state may lag the store.
    StorageFailure,
}

impl RefreshTrigger {
    /// Returns true if the trigger demands a full snapshot.
    pub fn requires_full_snapshot(&self) -> bool {
        !matches!(self, RefreshTrigger::Stale | RefreshTrigger::Explicit)
    }
}

/// Decides when and how to ask the host for catalog changes.
#[derive(Debug, Clone)]
pub struct SyncCoordinator {
    cursor: SyncCursor,
    staleness_threshold: Duration,
    in_flight: bool,
    full_snapshot_required: bool,
}

impl SyncCoordinator {
    /// Creates a coordinator starting from `cursor`.
    pub fn new(cursor: SyncCursor, staleness_threshold: Duration) -> Self {
        Self {
            cursor,
            staleness_threshold,
            in_flight: false,
            full_snapshot_required: false,
        }
    }

    /// Returns the current cursor.
    pub fn cursor(&self) -> SyncCursor {
        self.cursor
    }

    /// Returns true while a refresh request is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Returns true if the next refresh will ask for a full snapshot.
    pub fn full_snapshot_required(&self) -> bool {
        self.full_snapshot_required
    }

    /// Returns true if the last refresh is older than the threshold.
    pub fn is_stale(&self, now: SystemTime) -> bool {
        self.cursor.age(now) > self.staleness_threshold
    }

    /// Registers a trigger and returns the request to send, if any.
    ///
    /// Returns `None` when a refresh is already in flight; the trigger is
    /// folded into it.
    pub fn request(&mut self, trigger: RefreshTrigger, catalog: &Catalog) -> Option<RefreshRequest> {
        if trigger.requires_full_snapshot() {
            self.full_snapshot_required = true;
        }
        if self.in_flight {
            debug!(?trigger, "refresh already in flight, coalescing");
            return None;
        }

        let serial = if self.full_snapshot_required {
            0
        } else {
            self.cursor.last_applied_serial
        };
        self.in_flight = true;
        info!(?trigger, serial, "requesting catalog refresh");
        Some(RefreshRequest {
            last_applied_serial: serial,
            cached_items: catalog.cached_items(),
        })
    }

    /// Clears the in-flight marker after the request could not be sent.
    pub fn abandon_request(&mut self) {
        self.in_flight = false;
    }

    /// Notes that a catalog update arrived, accepted or not.
    pub fn on_catalog_update(&mut self) {
        self.in_flight = false;
    }

    /// Moves the cursor after a committed merge.
    ///
    /// A committed full snapshot also satisfies a pending full refresh.
    pub fn advance(&mut self, cursor: SyncCursor, full_snapshot: bool) {
        self.cursor = cursor;
        if full_snapshot {
            self.full_snapshot_required = false;
        }
    }

    /// Resets the cursor after local state was lost.
    pub fn reset(&mut self) {
        self.cursor = SyncCursor::INITIAL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdcstore_protocol::{AppMetadata, CatalogEntry, DownloadState};
    use xdcstore_storage::InMemoryScalarStore;

    fn catalog() -> Catalog {
        let metadata = AppMetadata {
            name: "Poll".into(),
            description: String::new(),
            author_name: String::new(),
            author_email: String::new(),
            source_code_url: String::new(),
            image: None,
            tag_name: "v2".into(),
            size: 0,
            date: 0,
        };
        [
            CatalogEntry::new("poll", metadata.clone()).with_state(DownloadState::Received),
            CatalogEntry::new("chess", metadata),
        ]
        .into_iter()
        .collect()
    }

    fn hour() -> Duration {
        Duration::from_secs(3600)
    }

    #[test]
    fn request_carries_cursor_and_cached_items() {
        let mut coordinator = SyncCoordinator::new(SyncCursor::at(4, SystemTime::now()), hour());
        let request = coordinator.request(RefreshTrigger::Explicit, &catalog()).unwrap();
        assert_eq!(request.last_applied_serial, 4);
        assert_eq!(request.cached_items, vec![("poll".into(), "v2".into())]);
        assert!(coordinator.is_in_flight());
    }

    #[test]
    fn requests_are_coalesced_until_update_arrives() {
        let mut coordinator = SyncCoordinator::new(SyncCursor::INITIAL, hour());
        assert!(coordinator.request(RefreshTrigger::Stale, &Catalog::new()).is_some());
        assert!(coordinator.request(RefreshTrigger::Explicit, &Catalog::new()).is_none());

        coordinator.on_catalog_update();
        assert!(coordinator.request(RefreshTrigger::Explicit, &Catalog::new()).is_some());
    }

    #[test]
    fn mismatch_requests_full_snapshot() {
        let mut coordinator = SyncCoordinator::new(SyncCursor::at(9, SystemTime::now()), hour());
        let request = coordinator
            .request(RefreshTrigger::SerialMismatch, &Catalog::new())
            .unwrap();
        assert_eq!(request.last_applied_serial, 0);

        // A delta does not satisfy the pending full refresh.
        coordinator.on_catalog_update();
        coordinator.advance(SyncCursor::at(10, SystemTime::now()), false);
        let request = coordinator.request(RefreshTrigger::Explicit, &Catalog::new()).unwrap();
        assert_eq!(request.last_applied_serial, 0);

        coordinator.on_catalog_update();
        coordinator.advance(SyncCursor::at(11, SystemTime::now()), true);
        let request = coordinator.request(RefreshTrigger::Explicit, &Catalog::new()).unwrap();
        assert_eq!(request.last_applied_serial, 11);
    }

    #[test]
    fn coalesced_full_trigger_is_remembered() {
        let mut coordinator = SyncCoordinator::new(SyncCursor::at(3, SystemTime::now()), hour());
        coordinator.request(RefreshTrigger::Explicit, &Catalog::new());
        assert!(coordinator
            .request(RefreshTrigger::StorageFailure, &Catalog::new())
            .is_none());
        assert!(coordinator.full_snapshot_required());
    }

    #[test]
    fn abandoned_request_clears_in_flight() {
        let mut coordinator = SyncCoordinator::new(SyncCursor::INITIAL, hour());
        coordinator.request(RefreshTrigger::Explicit, &Catalog::new());
        coordinator.abandon_request();
        assert!(!coordinator.is_in_flight());
    }

    #[test]
    fn staleness() {
        let now = SystemTime::now();
        let fresh = SyncCoordinator::new(SyncCursor::at(1, now), hour());
        assert!(!fresh.is_stale(now));

        let old = SyncCoordinator::new(SyncCursor::at(1, now - Duration::from_secs(7200)), hour());
        assert!(old.is_stale(now));

        assert!(SyncCoordinator::new(SyncCursor::INITIAL, hour()).is_stale(now));
    }

    #[tokio::test]
    async fn cursor_persists() {
        let scalars = InMemoryScalarStore::new();
        assert_eq!(SyncCursor::load(&scalars).await.unwrap(), SyncCursor::INITIAL);

        let cursor = SyncCursor::at(12, SystemTime::UNIX_EPOCH + Duration::from_secs(99));
        cursor.save(&scalars).await.unwrap();
        assert_eq!(SyncCursor::load(&scalars).await.unwrap(), cursor);
    }
}
