//! Descriptive metadata of catalog items.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// Complete descriptive record of a marketplace item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Name of the author.
    pub author_name: String,
    /// Contact address of the submitter.
    pub author_email: String,
    /// Where the source code lives.
    pub source_code_url: String,
    /// Base64 encoded icon, if the item ships one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Revision tag of the published binary.
    pub tag_name: String,
    /// Size of the binary in bytes.
    pub size: u64,
    /// Publish date as unix seconds.
    pub date: i64,
}

impl AppMetadata {
    /// Overwrites every field present in `patch`.
    ///
    /// Returns `true` if any field changed value.
    pub fn apply(&mut self, patch: &MetadataPatch) -> bool {
        let mut changed = false;
        ne_assign(&mut self.name, &patch.name, &mut changed);
        ne_assign(&mut self.description, &patch.description, &mut changed);
        ne_assign(&mut self.author_name, &patch.author_name, &mut changed);
        ne_assign(&mut self.author_email, &patch.author_email, &mut changed);
        ne_assign(&mut self.source_code_url, &patch.source_code_url, &mut changed);
        ne_assign(&mut self.tag_name, &patch.tag_name, &mut changed);
        ne_assign(&mut self.size, &patch.size, &mut changed);
        ne_assign(&mut self.date, &patch.date, &mut changed);
        if let Some(image) = &patch.image {
            if self.image.as_ref() != Some(image) {
                self.image = Some(image.clone());
                changed = true;
            }
        }
        changed
    }
}

/// Assigns `new` to `original` if present and different.
fn ne_assign<T: PartialEq + Clone>(original: &mut T, new: &Option<T>, changed: &mut bool) {
    if let Some(new) = new {
        if original != new {
            *original = new.clone();
            *changed = true;
        }
    }
}

/// A partial metadata record as carried by delta patches.
///
/// Absent fields leave the existing value untouched when merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPatch {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Contact address of the submitter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    /// Where the source code lives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code_url: Option<String>,
    /// Base64 encoded icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Revision tag of the published binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    /// Size of the binary in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Publish date as unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
}

impl MetadataPatch {
    /// Returns true if the patch carries no fields at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Lists the required fields this patch does not carry.
    ///
    /// `image` is optional and never reported.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.description.is_none() {
            missing.push("description");
        }
        if self.author_name.is_none() {
            missing.push("author_name");
        }
        if self.author_email.is_none() {
            missing.push("author_email");
        }
        if self.source_code_url.is_none() {
            missing.push("source_code_url");
        }
        if self.tag_name.is_none() {
            missing.push("tag_name");
        }
        if self.size.is_none() {
            missing.push("size");
        }
        if self.date.is_none() {
            missing.push("date");
        }
        missing
    }

    /// Returns true if the patch can stand in for a full record.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Converts the patch into full metadata for item `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::IncompleteRecord`] naming every absent
    /// required field.
    pub fn into_complete(self, id: &str) -> ProtocolResult<AppMetadata> {
        match self {
            MetadataPatch {
                name: Some(name),
                description: Some(description),
                author_name: Some(author_name),
                author_email: Some(author_email),
                source_code_url: Some(source_code_url),
                image,
                tag_name: Some(tag_name),
                size: Some(size),
                date: Some(date),
            } => Ok(AppMetadata {
                name,
                description,
                author_name,
                author_email,
                source_code_url,
                image,
                tag_name,
                size,
                date,
            }),
            incomplete => Err(ProtocolError::IncompleteRecord {
                id: id.to_string(),
                missing: incomplete.missing_fields(),
            }),
        }
    }
}

impl From<AppMetadata> for MetadataPatch {
    fn from(metadata: AppMetadata) -> Self {
        Self {
            name: Some(metadata.name),
            description: Some(metadata.description),
            author_name: Some(metadata.author_name),
            author_email: Some(metadata.author_email),
            source_code_url: Some(metadata.source_code_url),
            image: metadata.image,
            tag_name: Some(metadata.tag_name),
            size: Some(metadata.size),
            date: Some(metadata.date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll() -> AppMetadata {
        AppMetadata {
            name: "Poll".into(),
            description: "Create polls".into(),
            author_name: "Jonas".into(),
            author_email: "jonas@example.org".into(),
            source_code_url: "https://example.org/poll".into(),
            image: None,
            tag_name: "v1.11".into(),
            size: 4096,
            date: 1_700_000_000,
        }
    }

    #[test]
    fn apply_overwrites_present_fields_only() {
        let mut metadata = poll();
        let patch = MetadataPatch {
            description: Some("x".into()),
            ..Default::default()
        };

        assert!(metadata.apply(&patch));
        assert_eq!(metadata.description, "x");
        assert_eq!(metadata.name, "Poll");
        assert_eq!(metadata.tag_name, "v1.11");
    }

    #[test]
    fn apply_reports_no_change_for_equal_values() {
        let mut metadata = poll();
        let patch = MetadataPatch {
            name: Some("Poll".into()),
            ..Default::default()
        };
        assert!(!metadata.apply(&patch));
        assert!(!metadata.apply(&MetadataPatch::default()));
    }

    #[test]
    fn apply_sets_image() {
        let mut metadata = poll();
        let patch = MetadataPatch {
            image: Some("aWNvbg==".into()),
            ..Default::default()
        };
        assert!(metadata.apply(&patch));
        assert_eq!(metadata.image.as_deref(), Some("aWNvbg=="));
    }

    #[test]
    fn full_patch_is_complete() {
        let patch = MetadataPatch::from(poll());
        assert!(patch.is_complete());
        assert_eq!(patch.into_complete("poll").unwrap(), poll());
    }

    #[test]
    fn partial_patch_reports_missing_fields() {
        let patch = MetadataPatch {
            name: Some("Poll".into()),
            size: Some(1),
            ..Default::default()
        };
        assert_eq!(
            patch.missing_fields(),
            vec![
                "description",
                "author_name",
                "author_email",
                "source_code_url",
                "tag_name",
                "date"
            ]
        );

        let err = patch.into_complete("poll").unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::IncompleteRecord { ref id, .. } if id == "poll"
        ));
    }

    #[test]
    fn image_is_optional() {
        let mut patch = MetadataPatch::from(poll());
        patch.image = None;
        assert!(patch.is_complete());
    }

    #[test]
    fn empty_patch() {
        assert!(MetadataPatch::default().is_empty());
        assert!(!MetadataPatch::from(poll()).is_empty());
    }
}
