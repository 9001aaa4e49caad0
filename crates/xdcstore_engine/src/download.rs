//! Download state machine.
//!
//! ```text
//! Initial ──request──▶ Downloading ──delivered──▶ Received ──newer──▶ Updating
//!    ▲                      │                        │  ▲                │
//!    │                   failed                      │  └───delivered────┘
//!    │                      ▼                        │
//!    │               DownloadCancelled ──request──▶ Downloading
//!    └──────────────removed──────────────────────────┘ (also from Updating)
//! ```
//!
//! Host outcomes are accepted from every state. User intents are checked.
//! `Downloading` only lives for one session: an entry found in it on load,
//! or kept in it only by the store, is [`DownloadEvent::Interrupted`].

use xdcstore_protocol::DownloadState;

/// Something that moves an entry through its download lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadEvent {
    /// The user asked for the binary.
    UserRequested,
    /// The host delivered the binary.
    Delivered,
    /// The host reported that the download failed.
    Failed,
    /// The host announced a newer revision of a cached binary.
    NewerRevision,
    /// The user dropped the cached binary.
    UserRemoved,
    /// A download outlived the session that requested it.
    Interrupted,
}

/// Computes the state after `event`, or `None` if the event is not valid.
///
/// A download request on an `Updating` entry keeps `Updating`: the cached
/// binary stays forwardable until the newer one arrives.
pub fn transition(from: DownloadState, event: DownloadEvent) -> Option<DownloadState> {
    use DownloadEvent as E;
    use DownloadState as S;

    match (from, event) {
        (S::Initial | S::DownloadCancelled, E::UserRequested) => Some(S::Downloading),
        (S::Updating, E::UserRequested) => Some(S::Updating),
        (_, E::UserRequested) => None,

        (_, E::Delivered) => Some(S::Received),
        (_, E::Failed) => Some(S::DownloadCancelled),

        (S::Received | S::Updating, E::NewerRevision) => Some(S::Updating),
        (other, E::NewerRevision) => Some(other),

        (S::Received | S::Updating, E::UserRemoved) => Some(S::Initial),
        (_, E::UserRemoved) => None,

        (S::Downloading, E::Interrupted) => Some(S::DownloadCancelled),
        (other, E::Interrupted) => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DownloadEvent as E;
    use DownloadState as S;

    const ALL: [DownloadState; 5] = [
        S::Initial,
        S::Downloading,
        S::Received,
        S::DownloadCancelled,
        S::Updating,
    ];

    #[test]
    fn happy_path() {
        let s = transition(S::Initial, E::UserRequested).unwrap();
        assert_eq!(s, S::Downloading);
        let s = transition(s, E::Delivered).unwrap();
        assert_eq!(s, S::Received);
        let s = transition(s, E::NewerRevision).unwrap();
        assert_eq!(s, S::Updating);
        let s = transition(s, E::Delivered).unwrap();
        assert_eq!(s, S::Received);
    }

    #[test]
    fn failure_and_retry() {
        let s = transition(S::Downloading, E::Failed).unwrap();
        assert_eq!(s, S::DownloadCancelled);
        assert_eq!(transition(s, E::UserRequested), Some(S::Downloading));
    }

    #[test]
    fn host_outcomes_always_accepted() {
        for state in ALL {
            assert_eq!(transition(state, E::Delivered), Some(S::Received));
            assert_eq!(transition(state, E::Failed), Some(S::DownloadCancelled));
            assert!(transition(state, E::NewerRevision).is_some());
        }
    }

    #[test]
    fn initial_is_never_forced_to_updating() {
        assert_eq!(transition(S::Initial, E::NewerRevision), Some(S::Initial));
        assert_eq!(
            transition(S::Downloading, E::NewerRevision),
            Some(S::Downloading)
        );
    }

    #[test]
    fn invalid_user_intents() {
        assert_eq!(transition(S::Received, E::UserRequested), None);
        assert_eq!(transition(S::Downloading, E::UserRequested), None);
        assert_eq!(transition(S::Initial, E::UserRemoved), None);
        assert_eq!(transition(S::DownloadCancelled, E::UserRemoved), None);
        assert_eq!(transition(S::Updating, E::UserRemoved), Some(S::Initial));
    }

    #[test]
    fn interrupted_download_can_be_retried() {
        let s = transition(S::Downloading, E::Interrupted).unwrap();
        assert_eq!(s, S::DownloadCancelled);
        assert_eq!(transition(s, E::UserRequested), Some(S::Downloading));
        for state in ALL.into_iter().filter(|s| *s != S::Downloading) {
            assert_eq!(transition(state, E::Interrupted), Some(state));
        }
    }
}
