//! Error types for protocol decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while interpreting host messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The message does not match any known shape.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// A field is present but carries an unusable value.
    #[error("invalid field `{field}`: {message}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// A record that must be complete lacks required fields.
    #[error("incomplete record for `{id}`: missing {}", missing.join(", "))]
    IncompleteRecord {
        /// Item identifier of the record.
        id: String,
        /// Names of the absent required fields.
        missing: Vec<&'static str>,
    },
}

impl ProtocolError {
    /// Creates a malformed-message error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Creates an invalid-field error.
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_record_lists_fields() {
        let err = ProtocolError::IncompleteRecord {
            id: "poll".into(),
            missing: vec!["name", "tag_name"],
        };
        assert_eq!(
            err.to_string(),
            "incomplete record for `poll`: missing name, tag_name"
        );
    }
}
