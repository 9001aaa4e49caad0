//! Process-wide client flags.

use crate::error::EngineResult;
use serde::{Deserialize, Serialize};
use xdcstore_protocol::ObsoleteSeverity;
use xdcstore_storage::{load_value, store_value, ScalarStore};

const FLAGS_KEY: &str = "client_flags";

/// Flags raised by non-catalog host messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientFlags {
    /// Set when the host reports that this client is outdated.
    pub update_needed: Option<ObsoleteSeverity>,
    /// Set when the host acknowledged an upgrade request.
    pub update_acknowledged: bool,
    /// Set while a refresh request is outstanding.
    pub refresh_pending: bool,
}

/// The persisted subset of [`ClientFlags`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredFlags {
    update_needed: Option<ObsoleteSeverity>,
    update_acknowledged: bool,
}

impl ClientFlags {
    /// Records an obsolescence notice. A critical notice is never
    /// downgraded by a later advisory one.
    pub fn mark_obsolete(&mut self, severity: ObsoleteSeverity) {
        if self.update_needed != Some(ObsoleteSeverity::Critical) {
            self.update_needed = Some(severity);
        }
    }

    /// Loads the persisted flags; `refresh_pending` always starts cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value cannot be read or decoded.
    pub async fn load<K: ScalarStore + ?Sized>(scalars: &K) -> EngineResult<Self> {
        let stored: StoredFlags = load_value(scalars, FLAGS_KEY).await?.unwrap_or_default();
        Ok(Self {
            update_needed: stored.update_needed,
            update_acknowledged: stored.update_acknowledged,
            refresh_pending: false,
        })
    }

    /// Persists the durable flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    pub async fn save<K: ScalarStore + ?Sized>(&self, scalars: &K) -> EngineResult<()> {
        let stored = StoredFlags {
            update_needed: self.update_needed,
            update_acknowledged: self.update_acknowledged,
        };
        store_value(scalars, FLAGS_KEY, &stored).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdcstore_storage::InMemoryScalarStore;

    #[test]
    fn critical_is_sticky() {
        let mut flags = ClientFlags::default();
        flags.mark_obsolete(ObsoleteSeverity::Advisory);
        assert_eq!(flags.update_needed, Some(ObsoleteSeverity::Advisory));
        flags.mark_obsolete(ObsoleteSeverity::Critical);
        flags.mark_obsolete(ObsoleteSeverity::Advisory);
        assert_eq!(flags.update_needed, Some(ObsoleteSeverity::Critical));
    }

    #[tokio::test]
    async fn refresh_pending_is_not_persisted() {
        let scalars = InMemoryScalarStore::new();
        let flags = ClientFlags {
            update_needed: Some(ObsoleteSeverity::Critical),
            update_acknowledged: true,
            refresh_pending: true,
        };
        flags.save(&scalars).await.unwrap();

        let loaded = ClientFlags::load(&scalars).await.unwrap();
        assert_eq!(loaded.update_needed, Some(ObsoleteSeverity::Critical));
        assert!(loaded.update_acknowledged);
        assert!(!loaded.refresh_pending);
    }
}
