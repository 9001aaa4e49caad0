//! Change feed for observing the catalog.
//!
//! The feed is the reactive projection consumed by the presentation layer.
//! Events are emitted only after a change is committed to the store and the
//! in-memory catalog, in commit order.
//!
//! # Usage
//!
//! ```rust,ignore
//! let rx = client.subscribe();
//! std::thread::spawn(move || {
//!     while let Ok(event) = rx.recv() {
//!         println!("catalog change: {:?}", event.change);
//!     }
//! });
//! ```

use crate::flags::ClientFlags;
use parking_lot::RwLock;
use std::sync::mpsc::{self, Receiver, Sender};
use xdcstore_protocol::DownloadState;

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogChange {
    /// A new entry appeared.
    Added(String),
    /// An entry's metadata (and possibly state) changed.
    Updated(String),
    /// An entry was removed.
    Removed(String),
    /// Only the download state of an entry changed.
    StateChanged {
        /// Entry id.
        id: String,
        /// New state.
        state: DownloadState,
    },
    /// The sync cursor advanced to a new serial.
    CursorAdvanced(u64),
    /// Client flags changed.
    FlagsChanged(ClientFlags),
}

/// A single event from the change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEvent {
    /// Feed-local sequence number, starting at 1.
    pub sequence: u64,
    /// The change.
    pub change: CatalogChange,
}

/// Distributes committed catalog changes to subscribers.
///
/// The change feed:
/// - Emits only committed changes
/// - Preserves commit order
/// - Supports multiple subscribers
/// - Is thread-safe
#[derive(Debug)]
pub struct ChangeFeed {
    subscribers: RwLock<Vec<Sender<CatalogEvent>>>,
    history: RwLock<History>,
    max_history: usize,
}

#[derive(Debug, Default)]
struct History {
    events: Vec<CatalogEvent>,
    last_sequence: u64,
}

impl ChangeFeed {
    /// Creates a change feed with the default history limit.
    pub fn new() -> Self {
        Self::with_max_history(1024)
    }

    /// Creates a change feed with a specific history limit.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(History::default()),
            max_history,
        }
    }

    /// Subscribes to all future events.
    ///
    /// The receiver should be drained regularly to avoid unbounded growth.
    pub fn subscribe(&self) -> Receiver<CatalogEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits a change to all subscribers and returns its sequence number.
    pub fn emit(&self, change: CatalogChange) -> u64 {
        let event = {
            let mut history = self.history.write();
            history.last_sequence += 1;
            let event = CatalogEvent {
                sequence: history.last_sequence,
                change,
            };
            history.events.push(event.clone());
            if history.events.len() > self.max_history {
                let to_remove = history.events.len() - self.max_history;
                history.events.drain(0..to_remove);
            }
            event
        };

        let sequence = event.sequence;
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        sequence
    }

    /// Emits several changes from one commit.
    pub fn emit_batch(&self, changes: impl IntoIterator<Item = CatalogChange>) {
        for change in changes {
            self.emit(change);
        }
    }

    /// Returns events with sequence greater than `cursor`, up to `limit`.
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<CatalogEvent> {
        self.history
            .read()
            .events
            .iter()
            .filter(|e| e.sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns the latest emitted sequence number.
    pub fn latest_sequence(&self) -> u64 {
        self.history.read().last_sequence
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of events in history.
    pub fn history_len(&self) -> usize {
        self.history.read().events.len()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
