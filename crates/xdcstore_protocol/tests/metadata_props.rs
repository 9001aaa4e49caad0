//! Property tests for metadata merging.

use proptest::prelude::*;
use xdcstore_protocol::{AppMetadata, MetadataPatch};

fn metadata_strategy() -> impl Strategy<Value = AppMetadata> {
    (
        "[A-Za-z ]{1,16}",
        "[a-z ]{0,40}",
        "[A-Za-z]{1,12}",
        "[a-z]{1,8}@example\\.org",
        "https://example\\.org/[a-z]{1,8}",
        proptest::option::of("[A-Za-z0-9+/]{4,16}"),
        "v[0-9]\\.[0-9]{1,2}",
        any::<u32>(),
        0i64..2_000_000_000,
    )
        .prop_map(
            |(name, description, author_name, author_email, source_code_url, image, tag_name, size, date)| {
                AppMetadata {
                    name,
                    description,
                    author_name,
                    author_email,
                    source_code_url,
                    image,
                    tag_name,
                    size: u64::from(size),
                    date,
                }
            },
        )
}

fn patch_strategy() -> impl Strategy<Value = MetadataPatch> {
    (
        proptest::option::of("[A-Za-z ]{1,16}"),
        proptest::option::of("[a-z ]{0,40}"),
        proptest::option::of("v[0-9]\\.[0-9]{1,2}"),
        proptest::option::of(any::<u32>()),
    )
        .prop_map(|(name, description, tag_name, size)| MetadataPatch {
            name,
            description,
            tag_name,
            size: size.map(u64::from),
            ..Default::default()
        })
}

proptest! {
    #[test]
    fn applying_a_patch_twice_is_idempotent(base in metadata_strategy(), patch in patch_strategy()) {
        let mut once = base.clone();
        once.apply(&patch);
        let mut twice = once.clone();
        let changed_again = twice.apply(&patch);

        prop_assert!(!changed_again);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn absent_fields_are_untouched(base in metadata_strategy(), patch in patch_strategy()) {
        let mut merged = base.clone();
        merged.apply(&patch);

        prop_assert_eq!(&merged.author_name, &base.author_name);
        prop_assert_eq!(&merged.source_code_url, &base.source_code_url);
        prop_assert_eq!(merged.date, base.date);
        if patch.name.is_none() {
            prop_assert_eq!(&merged.name, &base.name);
        }
        if let Some(tag) = &patch.tag_name {
            prop_assert_eq!(&merged.tag_name, tag);
        }
    }

    #[test]
    fn full_patch_reproduces_metadata(base in metadata_strategy()) {
        let patch = MetadataPatch::from(base.clone());
        prop_assert_eq!(patch.into_complete("id").unwrap(), base);
    }
}
