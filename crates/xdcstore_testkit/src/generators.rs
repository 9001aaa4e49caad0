//! Property-based test generators using proptest.
//!
//! Provides strategies for generating catalog data and host message
//! sequences that keep the invariants the engine relies on.

use proptest::prelude::*;
use xdcstore_protocol::{AppMetadata, DeltaPatch, DownloadState, MetadataPatch, Snapshot};

/// Strategy for catalog ids drawn from a small pool, so that sequences of
/// patches collide on the same ids.
pub fn item_id_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["poll", "chess", "draw", "todo", "quiz", "map"])
        .prop_map(String::from)
}

/// Strategy for complete metadata.
pub fn app_metadata_strategy() -> impl Strategy<Value = AppMetadata> {
    (
        "[A-Za-z][A-Za-z ]{0,15}",
        "[a-z ]{0,40}",
        "[A-Za-z]{1,12}",
        "v[0-9]\\.[0-9]{1,2}",
        0u64..10_000_000,
        0i64..2_000_000_000,
    )
        .prop_map(|(name, description, author, tag_name, size, date)| AppMetadata {
            author_email: format!("{}@example.org", author.to_lowercase()),
            source_code_url: format!("https://example.org/{}", author.to_lowercase()),
            name,
            description,
            author_name: author,
            image: None,
            tag_name,
            size,
            date,
        })
}

/// Strategy for partial metadata updates.
pub fn metadata_patch_strategy() -> impl Strategy<Value = MetadataPatch> {
    (
        proptest::option::of("[A-Za-z][A-Za-z ]{0,15}"),
        proptest::option::of("[a-z ]{0,40}"),
        proptest::option::of("v[0-9]\\.[0-9]{1,2}"),
        proptest::option::of(0u64..10_000_000),
    )
        .prop_map(|(name, description, tag_name, size)| MetadataPatch {
            name,
            description,
            tag_name,
            size,
            ..Default::default()
        })
}

/// Strategy for download states.
pub fn download_state_strategy() -> impl Strategy<Value = DownloadState> {
    prop_oneof![
        Just(DownloadState::Initial),
        Just(DownloadState::Downloading),
        Just(DownloadState::Received),
        Just(DownloadState::DownloadCancelled),
        Just(DownloadState::Updating),
    ]
}

/// Strategy for a snapshot at `serial`.
pub fn snapshot_strategy(serial: u64) -> impl Strategy<Value = Snapshot> {
    prop::collection::btree_map(item_id_strategy(), app_metadata_strategy(), 0..6).prop_map(
        move |entries| Snapshot {
            serial,
            entries,
            updating: Vec::new(),
        },
    )
}

/// One change in a generated delta.
#[derive(Debug, Clone)]
pub enum ChangeSpec {
    /// A complete record.
    Full(AppMetadata),
    /// A partial record.
    Partial(MetadataPatch),
    /// The delete sentinel.
    Delete,
}

/// Strategy for a delta from `old_serial` to `old_serial + 1`.
///
/// Partial records may target ids unknown to the receiver; callers that
/// need admissible patches should filter against their catalog.
pub fn delta_strategy(old_serial: u64) -> impl Strategy<Value = DeltaPatch> {
    (
        prop::collection::btree_map(
            item_id_strategy(),
            prop_oneof![
                app_metadata_strategy().prop_map(ChangeSpec::Full),
                metadata_patch_strategy().prop_map(ChangeSpec::Partial),
                Just(ChangeSpec::Delete),
            ],
            0..5,
        ),
        prop::collection::vec(item_id_strategy(), 0..3),
    )
        .prop_map(move |(changes, updating)| DeltaPatch {
            old_serial,
            serial: old_serial + 1,
            changes: changes
                .into_iter()
                .map(|(id, change)| {
                    let change = match change {
                        ChangeSpec::Full(metadata) => Some(MetadataPatch::from(metadata)),
                        ChangeSpec::Partial(patch) => Some(patch),
                        ChangeSpec::Delete => None,
                    };
                    (id, change)
                })
                .collect(),
            updating,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn generated_metadata_is_complete() {
        let mut runner = TestRunner::default();
        for _ in 0..32 {
            let metadata = app_metadata_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert!(MetadataPatch::from(metadata).is_complete());
        }
    }

    #[test]
    fn generated_deltas_advance_by_one() {
        let mut runner = TestRunner::default();
        let patch = delta_strategy(7).new_tree(&mut runner).unwrap().current();
        assert_eq!(patch.old_serial, 7);
        assert_eq!(patch.serial, 8);
    }
}
