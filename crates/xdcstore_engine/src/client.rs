//! Catalog client facade.
//!
//! [`CatalogClient`] is the single writer for one catalog. Every inbound
//! message and user intent runs under one async mutex, including all of the
//! store writes it causes, and the in-memory catalog changes only after
//! those writes succeed. Readers never take that mutex: they read a
//! projection that is swapped in after each commit.

use crate::catalog::Catalog;
use crate::config::ClientConfig;
use crate::coordinator::{RefreshTrigger, SyncCoordinator, SyncCursor};
use crate::download::{transition, DownloadEvent};
use crate::error::{EngineError, EngineResult};
use crate::feed::{CatalogChange, CatalogEvent, ChangeFeed};
use crate::flags::ClientFlags;
use crate::reconcile::{self, Reconciliation, RejectReason};
use crate::retry::with_retry;
use crate::transport::HostChannel;
use parking_lot::RwLock;
use serde_json::Value;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use xdcstore_protocol::{
    classify_with_reason, is_catalog_payload, CachedBinary, CatalogEntry, HostMessage,
    HostRequest,
};
use xdcstore_storage::{CatalogStore, FileCatalogStore, FileScalarStore, ScalarStore};

/// Subdirectory of a client directory holding rows and binaries.
pub const CATALOG_DIR: &str = "catalog";

/// Subdirectory of a client directory holding the cursor and flags.
pub const STATE_DIR: &str = "state";

/// Counts of what a committed change touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Rows inserted.
    pub added: usize,
    /// Rows updated.
    pub updated: usize,
    /// Rows removed.
    pub removed: usize,
    /// Cursor serial after the change.
    pub serial: u64,
}

/// Result of handling one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The catalog changed and the change is durable.
    Applied(ApplySummary),
    /// Only client flags changed.
    FlagsUpdated(ClientFlags),
    /// The message was discarded and a full refresh requested.
    Rejected(RejectReason),
    /// The message was dropped without any change.
    Ignored,
}

/// State owned by the writer.
#[derive(Debug)]
struct EngineState {
    catalog: Catalog,
    coordinator: SyncCoordinator,
    flags: ClientFlags,
}

impl EngineState {
    fn effective_flags(&self) -> ClientFlags {
        ClientFlags {
            refresh_pending: self.coordinator.is_in_flight(),
            ..self.flags
        }
    }
}

/// What readers see.
#[derive(Debug, Clone, Default)]
struct ClientView {
    catalog: Catalog,
    cursor: SyncCursor,
    flags: ClientFlags,
}

/// A catalog client bound to a store, scalar storage and a host channel.
pub struct CatalogClient<S, K, C> {
    store: S,
    scalars: K,
    channel: C,
    config: ClientConfig,
    state: Mutex<EngineState>,
    view: RwLock<ClientView>,
    feed: ChangeFeed,
}

impl<C: HostChannel> CatalogClient<FileCatalogStore, FileScalarStore, C> {
    /// Opens a file-backed client rooted at `dir`.
    ///
    /// Rows and binaries live in [`CATALOG_DIR`], the cursor and flags in
    /// [`STATE_DIR`].
    ///
    /// # Errors
    ///
    /// Returns an error if either store cannot be opened or loaded.
    pub async fn open_dir(dir: &Path, channel: C, config: ClientConfig) -> EngineResult<Self> {
        let store = FileCatalogStore::open(&dir.join(CATALOG_DIR))?;
        let scalars = FileScalarStore::open(&dir.join(STATE_DIR))?;
        Self::open(store, scalars, channel, config).await
    }
}

impl<S, K, C> CatalogClient<S, K, C>
where
    S: CatalogStore,
    K: ScalarStore,
    C: HostChannel,
{
    /// Loads the catalog and cursor and, if the catalog is stale, asks the
    /// host for changes.
    ///
    /// An empty store paired with a nonzero cursor means local state was
    /// lost; the cursor is reset so the next refresh asks for everything.
    /// Entries still `Downloading` from an earlier session become
    /// `DownloadCancelled` so they can be requested again.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or scalar storage cannot be read.
    pub async fn open(store: S, scalars: K, channel: C, config: ClientConfig) -> EngineResult<Self> {
        let rows = with_retry(&config.storage_retry, "get_all", || store.get_all()).await?;
        let mut catalog: Catalog = rows.into_iter().collect();

        let interrupted: Vec<CatalogEntry> = catalog
            .iter()
            .filter_map(|entry| {
                let next = transition(entry.state, DownloadEvent::Interrupted)?;
                (next != entry.state).then(|| entry.clone().with_state(next))
            })
            .collect();
        if !interrupted.is_empty() {
            warn!(
                count = interrupted.len(),
                "downloads from a previous session never completed, marking them cancelled"
            );
            with_retry(&config.storage_retry, "update_many", || {
                store.update_many(&interrupted)
            })
            .await?;
            for entry in interrupted {
                catalog.insert(entry);
            }
        }

        let mut coordinator =
            SyncCoordinator::new(SyncCursor::load(&scalars).await?, config.staleness_threshold);
        if catalog.is_empty() && !coordinator.cursor().is_initial() {
            warn!(
                serial = coordinator.cursor().last_applied_serial,
                "catalog store is empty but cursor is not, resetting cursor"
            );
            coordinator.reset();
            coordinator.cursor().save(&scalars).await?;
        }
        let cursor = coordinator.cursor();
        let flags = ClientFlags::load(&scalars).await?;

        info!(
            entries = catalog.len(),
            serial = cursor.last_applied_serial,
            "catalog loaded"
        );

        let state = EngineState {
            catalog: catalog.clone(),
            coordinator,
            flags,
        };
        let view = ClientView {
            catalog,
            cursor,
            flags: state.effective_flags(),
        };
        let client = Self {
            store,
            scalars,
            channel,
            feed: ChangeFeed::with_max_history(config.feed_history),
            config,
            state: Mutex::new(state),
            view: RwLock::new(view),
        };

        if let Err(err) = client.refresh_if_stale().await {
            warn!(error = %err, "could not request refresh on load");
        }
        Ok(client)
    }

    /// Classifies and handles a raw host payload.
    ///
    /// A snapshot or patch that fails validation is
    /// [`ApplyOutcome::Rejected`] and a full refresh is requested. Any other
    /// payload that cannot be classified is ignored.
    ///
    /// # Errors
    ///
    /// See [`CatalogClient::handle`].
    pub async fn handle_raw(&self, raw: &Value) -> EngineResult<ApplyOutcome> {
        let message = match classify_with_reason(raw) {
            Ok(message) => message,
            Err(err) if is_catalog_payload(raw) => {
                let mut state = self.state.lock().await;
                state.coordinator.on_catalog_update();
                let reason = RejectReason::Malformed {
                    reason: err.to_string(),
                };
                return Ok(self.reject(&mut state, reason).await);
            }
            Err(err) => {
                warn!(reason = %err, "unrecognized host payload");
                HostMessage::Unrecognized
            }
        };
        self.handle(message).await
    }

    /// Parses a JSON host payload and handles it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Codec`] if `text` is not JSON, otherwise see
    /// [`CatalogClient::handle`].
    pub async fn handle_text(&self, text: &str) -> EngineResult<ApplyOutcome> {
        let raw: Value =
            serde_json::from_str(text).map_err(|e| EngineError::Codec(e.to_string()))?;
        self.handle_raw(&raw).await
    }

    /// Handles one classified host message.
    ///
    /// Protocol problems are reported as [`ApplyOutcome::Rejected`], not as
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] if the change could not be made
    /// durable. The in-memory catalog is unchanged in that case and the next
    /// refresh asks for a full snapshot.
    pub async fn handle(&self, message: HostMessage) -> EngineResult<ApplyOutcome> {
        let mut state = self.state.lock().await;
        debug!(kind = message.kind().as_str(), "handling host message");

        match &message {
            HostMessage::Unrecognized => {
                warn!("dropping unrecognized host message");
                Ok(ApplyOutcome::Ignored)
            }
            HostMessage::ObsoleteClientNotice { severity, tag_name } => {
                info!(?severity, %tag_name, "host reports this client is outdated");
                let mut flags = state.flags;
                flags.mark_obsolete(*severity);
                self.set_flags(&mut state, flags).await
            }
            HostMessage::UpdateAcknowledged => {
                info!("host acknowledged the upgrade request");
                let mut flags = state.flags;
                flags.update_acknowledged = true;
                self.set_flags(&mut state, flags).await
            }
            HostMessage::FullSnapshot(_) | HostMessage::DeltaPatch(_) => {
                state.coordinator.on_catalog_update();
                let stored = match &message {
                    HostMessage::FullSnapshot(_) => {
                        let rows = with_retry(&self.config.storage_retry, "get_all", || {
                            self.store.get_all()
                        })
                        .await;
                        match rows {
                            Ok(rows) => Some(rows.into_iter().collect::<Catalog>()),
                            Err(err) => return Err(self.storage_failed(&mut state, err.into()).await),
                        }
                    }
                    _ => None,
                };
                let stored = stored.as_ref().unwrap_or(&state.catalog);
                let cursor = state.coordinator.cursor();
                match reconcile::apply(&message, &state.catalog, &cursor, stored, SystemTime::now()) {
                    Ok(Some(plan)) => self.commit(&mut state, plan).await.map(ApplyOutcome::Applied),
                    Ok(None) => {
                        self.publish(&state, Vec::new());
                        Ok(ApplyOutcome::Ignored)
                    }
                    Err(reason) => Ok(self.reject(&mut state, reason).await),
                }
            }
            HostMessage::DownloadSucceeded { id, .. } | HostMessage::DownloadFailed { id, .. } => {
                let cursor = state.coordinator.cursor();
                match reconcile::apply(&message, &state.catalog, &cursor, &state.catalog, SystemTime::now()) {
                    Ok(Some(plan)) => self.commit(&mut state, plan).await.map(ApplyOutcome::Applied),
                    _ => {
                        warn!(%id, kind = message.kind().as_str(), "download result for unknown entry");
                        Ok(ApplyOutcome::Ignored)
                    }
                }
            }
        }
    }

    /// Asks the host for the binary of `id` and marks it `Downloading`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownEntry`], [`EngineError::InvalidTransition`]
    /// if a download is not possible in the entry's state, a channel error if
    /// the request could not be sent, or a storage error.
    pub async fn request_download(&self, id: &str) -> EngineResult<()> {
        let mut state = self.state.lock().await;
        let cursor = state.coordinator.cursor();
        let plan = reconcile::apply_event(
            &state.catalog,
            &cursor,
            id,
            DownloadEvent::UserRequested,
            None,
        )?;
        self.channel
            .send(&HostRequest::Download {
                app_id: id.to_string(),
            })
            .await?;
        info!(%id, "download requested");
        self.commit(&mut state, plan).await?;
        Ok(())
    }

    /// Returns the cached binary of `id` for forwarding.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownEntry`], [`EngineError::NotCached`] if
    /// the entry holds no binary, or a storage error.
    pub async fn request_forward(&self, id: &str) -> EngineResult<CachedBinary> {
        let entry = self
            .entry(id)
            .ok_or_else(|| EngineError::UnknownEntry(id.to_string()))?;
        if !entry.state.can_forward() {
            return Err(EngineError::NotCached(id.to_string()));
        }
        with_retry(&self.config.storage_retry, "get_binary", || {
            self.store.get_binary(id)
        })
        .await?
        .ok_or_else(|| EngineError::NotCached(id.to_string()))
    }

    /// Drops the cached binary of `id` and returns it to `Initial`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownEntry`],
    /// [`EngineError::InvalidTransition`] if nothing is cached, or a storage
    /// error.
    pub async fn request_remove(&self, id: &str) -> EngineResult<()> {
        let mut state = self.state.lock().await;
        let cursor = state.coordinator.cursor();
        let plan = reconcile::apply_event(
            &state.catalog,
            &cursor,
            id,
            DownloadEvent::UserRemoved,
            None,
        )?;
        self.commit(&mut state, plan).await?;
        info!(%id, "cached binary removed");
        Ok(())
    }

    /// Asks the host for catalog changes.
    ///
    /// Returns `false` if a refresh was already in flight.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the request could not be sent.
    pub async fn request_refresh(&self) -> EngineResult<bool> {
        let mut state = self.state.lock().await;
        let sent = self.send_refresh(&mut state, RefreshTrigger::Explicit).await;
        self.publish(&state, Vec::new());
        sent
    }

    /// Asks the host for changes if the last refresh is too old.
    ///
    /// Returns `true` if a request was sent.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the request could not be sent.
    pub async fn refresh_if_stale(&self) -> EngineResult<bool> {
        let mut state = self.state.lock().await;
        if !state.coordinator.is_stale(SystemTime::now()) {
            return Ok(false);
        }
        let sent = self.send_refresh(&mut state, RefreshTrigger::Stale).await;
        self.publish(&state, Vec::new());
        sent
    }

    /// Asks the host to resend a current build of this client.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the request could not be sent, or a
    /// storage error if the flags could not be saved.
    pub async fn request_upgrade(&self) -> EngineResult<()> {
        let mut state = self.state.lock().await;
        self.channel.send(&HostRequest::UpgradeClient).await?;
        let mut flags = state.flags;
        flags.update_acknowledged = false;
        self.set_flags(&mut state, flags).await?;
        Ok(())
    }

    /// Returns every entry in id order.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.view.read().catalog.iter().cloned().collect()
    }

    /// Returns entries with received items first, then newest first.
    pub fn entries_sorted(&self) -> Vec<CatalogEntry> {
        self.view.read().catalog.sorted()
    }

    /// Returns the entry for `id`.
    pub fn entry(&self, id: &str) -> Option<CatalogEntry> {
        self.view.read().catalog.get(id).cloned()
    }

    /// Returns the current client flags.
    pub fn flags(&self) -> ClientFlags {
        self.view.read().flags
    }

    /// Returns the current sync cursor.
    pub fn cursor(&self) -> SyncCursor {
        self.view.read().cursor
    }

    /// Subscribes to committed catalog changes.
    pub fn subscribe(&self) -> Receiver<CatalogEvent> {
        self.feed.subscribe()
    }

    /// Returns change events after `sequence`, up to `limit`.
    pub fn poll_changes(&self, sequence: u64, limit: usize) -> Vec<CatalogEvent> {
        self.feed.poll(sequence, limit)
    }

    /// Returns the underlying catalog store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn commit(
        &self,
        state: &mut EngineState,
        plan: Reconciliation,
    ) -> EngineResult<ApplySummary> {
        if let Err(err) = plan
            .effects
            .execute(&self.store, &self.config.storage_retry)
            .await
        {
            return Err(self.storage_failed(state, err.into()).await);
        }
        if plan.cursor != state.coordinator.cursor() {
            if let Err(err) = plan.cursor.save(&self.scalars).await {
                return Err(self.storage_failed(state, err).await);
            }
        }

        let summary = ApplySummary {
            added: plan.effects.added.len(),
            updated: plan.effects.updated.len(),
            removed: plan.effects.removed.len(),
            serial: plan.cursor.last_applied_serial,
        };
        state.catalog = plan.catalog;
        state.coordinator.advance(plan.cursor, plan.full_snapshot);
        if plan.full_snapshot || summary.added + summary.updated + summary.removed > 0 {
            info!(
                added = summary.added,
                updated = summary.updated,
                removed = summary.removed,
                serial = summary.serial,
                "catalog change committed"
            );
        }
        self.publish(state, plan.changes);
        Ok(summary)
    }

    async fn set_flags(
        &self,
        state: &mut EngineState,
        flags: ClientFlags,
    ) -> EngineResult<ApplyOutcome> {
        flags.save(&self.scalars).await?;
        state.flags = flags;
        self.publish(state, Vec::new());
        Ok(ApplyOutcome::FlagsUpdated(state.effective_flags()))
    }

    async fn send_refresh(
        &self,
        state: &mut EngineState,
        trigger: RefreshTrigger,
    ) -> EngineResult<bool> {
        let Some(request) = state.coordinator.request(trigger, &state.catalog) else {
            return Ok(false);
        };
        if let Err(err) = self.channel.send(&HostRequest::Refresh(request)).await {
            state.coordinator.abandon_request();
            return Err(err);
        }
        Ok(true)
    }

    async fn reject(&self, state: &mut EngineState, reason: RejectReason) -> ApplyOutcome {
        warn!(%reason, "rejected catalog update");
        if let Err(err) = self.send_refresh(state, reason.trigger()).await {
            warn!(error = %err, "could not request full refresh");
        }
        self.publish(state, Vec::new());
        ApplyOutcome::Rejected(reason)
    }

    async fn storage_failed(&self, state: &mut EngineState, err: EngineError) -> EngineError {
        warn!(error = %err, "store commit failed, catalog left unchanged");
        if let Err(send_err) = self
            .send_refresh(state, RefreshTrigger::StorageFailure)
            .await
        {
            warn!(error = %send_err, "could not request full refresh");
        }
        self.publish(state, Vec::new());
        err
    }

    fn publish(&self, state: &EngineState, changes: Vec<CatalogChange>) {
        let flags = state.effective_flags();
        let flags_changed = {
            let mut view = self.view.write();
            let changed = view.flags != flags;
            view.catalog = state.catalog.clone();
            view.cursor = state.coordinator.cursor();
            view.flags = flags;
            changed
        };
        self.feed.emit_batch(changes);
        if flags_changed {
            self.feed.emit(CatalogChange::FlagsChanged(flags));
        }
    }
}

impl<S, K, C> std::fmt::Debug for CatalogClient<S, K, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view = self.view.read();
        f.debug_struct("CatalogClient")
            .field("entries", &view.catalog.len())
            .field("cursor", &view.cursor)
            .field("flags", &view.flags)
            .finish_non_exhaustive()
    }
}
