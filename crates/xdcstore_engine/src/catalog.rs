//! The in-memory catalog.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use xdcstore_protocol::{CatalogEntry, DownloadState};

/// All known catalog entries, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `id`.
    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    /// Returns a mutable reference to the entry for `id`.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut CatalogEntry> {
        self.entries.get_mut(id)
    }

    /// Returns true if an entry with `id` exists.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Inserts or replaces an entry.
    pub fn insert(&mut self, entry: CatalogEntry) -> Option<CatalogEntry> {
        self.entries.insert(entry.id.clone(), entry)
    }

    /// Removes and returns the entry for `id`.
    pub fn remove(&mut self, id: &str) -> Option<CatalogEntry> {
        self.entries.remove(id)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Lists `(id, tag_name)` for every entry that is not `Initial`.
    ///
    /// The tag is the catalog's current one, not necessarily the revision
    /// whose binary is cached. `Downloading` and `DownloadCancelled` entries
    /// are listed too.
    pub fn cached_items(&self) -> Vec<(String, String)> {
        self.iter()
            .filter(|entry| entry.state != DownloadState::Initial)
            .map(|entry| (entry.id.clone(), entry.tag_name().to_string()))
            .collect()
    }

    /// Returns entries with received items first, then newest first.
    pub fn sorted(&self) -> Vec<CatalogEntry> {
        let mut entries: Vec<_> = self.iter().cloned().collect();
        entries.sort_by_key(|entry| {
            (
                entry.state != DownloadState::Received,
                Reverse(entry.metadata.date),
            )
        });
        entries
    }
}

impl FromIterator<CatalogEntry> for Catalog {
    fn from_iter<I: IntoIterator<Item = CatalogEntry>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|entry| (entry.id.clone(), entry))
                .collect(),
        }
    }
}
