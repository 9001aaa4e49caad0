//! CBOR encoding of stored rows.

use crate::error::{StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a value to CBOR bytes.
pub(crate) fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StorageError::Codec(e.to_string()))?;
    Ok(buf)
}

/// Decodes a value from CBOR bytes.
pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Codec(e.to_string()))
}

/// Hex-encodes a key so it is safe to use as a file name.
pub(crate) fn key_to_file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() * 2);
    for byte in key.as_bytes() {
        name.push_str(&format!("{byte:02x}"));
    }
    name
}

/// Reverses [`key_to_file_name`].
pub(crate) fn file_name_to_key(name: &str) -> Option<String> {
    if name.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..name.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(name.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cbor_roundtrip() {
        let value = ("poll".to_string(), 42u64);
        let bytes = encode(&value).unwrap();
        let back: (String, u64) = decode(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn decode_garbage_is_codec_error() {
        let result: StorageResult<String> = decode(&[0xff, 0x00]);
        assert!(matches!(result, Err(StorageError::Codec(_))));
    }

    #[test]
    fn file_names_are_reversible() {
        for key in ["poll", "a/b", "../x", "ünïcode", ""] {
            let name = key_to_file_name(key);
            assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
            assert_eq!(file_name_to_key(&name).as_deref(), Some(key));
        }
        assert_eq!(file_name_to_key("abc"), None);
        assert_eq!(file_name_to_key("zz"), None);
    }
}
