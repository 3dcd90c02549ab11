//! Base64 payloads, decoded on first access.
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// At least one of the two cells is always filled.
#[derive(Clone, Default)]
pub struct Binary {
    encoded: OnceCell<String>,
    decoded: OnceCell<Vec<u8>>,
}

impl Binary {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Binary { encoded: OnceCell::new(), decoded: OnceCell::with_value(bytes.into()) }
    }

    /// Validates `encoded` and keeps the decoded bytes.
    pub fn from_base64(encoded: impl Into<String>) -> Result<Self, base64::DecodeError> {
        let encoded = encoded.into();
        let decoded = STANDARD.decode(&encoded)?;
        Ok(Binary { encoded: OnceCell::with_value(encoded), decoded: OnceCell::with_value(decoded) })
    }

    /// No validation; [`Binary::bytes`] reports bad input later.
    pub fn from_base64_unchecked(encoded: impl Into<String>) -> Self {
        Binary { encoded: OnceCell::with_value(encoded.into()), decoded: OnceCell::new() }
    }

    pub fn as_base64(&self) -> &str {
        self.encoded.get_or_init(|| STANDARD.encode(self.decoded.get().map(Vec::as_slice).unwrap_or_default()))
    }

    pub fn bytes(&self) -> Result<&[u8], base64::DecodeError> {
        self.decoded
            .get_or_try_init(|| STANDARD.decode(self.as_base64()))
            .map(Vec::as_slice)
    }
}

impl PartialEq for Binary {
    fn eq(&self, other: &Self) -> bool {
        self.as_base64() == other.as_base64()
    }
}

impl Eq for Binary {}

impl fmt::Debug for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Binary").field(&self.as_base64()).finish()
    }
}

impl fmt::Display for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_base64())
    }
}

impl Serialize for Binary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_base64())
    }
}

impl<'de> Deserialize<'de> for Binary {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(d)?;
        let Value::String(s) = &raw else {
            return Err(super::shape_error(&raw, &["base64 string"], "Binary"));
        };
        Binary::from_base64(s.as_str()).map_err(|e| serde::de::Error::custom(format!("Binary: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hello() {
        let bin: Binary = serde_json::from_value(json!("SGVsbG8=")).unwrap();
        assert_eq!(bin.bytes().unwrap(), b"Hello");
        assert_eq!(serde_json::to_value(&bin).unwrap(), json!("SGVsbG8="));

        let from_bytes = Binary::from_bytes(b"Hello".to_vec());
        assert_eq!(from_bytes.as_base64(), "SGVsbG8=");
        assert_eq!(from_bytes, bin);
    }

    #[test]
    fn every_constructor_agrees() {
        let src = "SGVsbG8gV29ybGQ=";
        for bin in [
            Binary::from_base64(src).unwrap(),
            Binary::from_base64_unchecked(src),
            Binary::from_bytes(b"Hello World".to_vec()),
        ] {
            assert_eq!(bin.to_string(), src);
            assert_eq!(bin.bytes().unwrap(), b"Hello World");
        }
    }

    #[test]
    fn invalid_input() {
        assert!(serde_json::from_value::<Binary>(json!("Invalid")).is_err());
        assert!(serde_json::from_value::<Binary>(json!(12)).is_err());
        assert!(Binary::from_base64_unchecked("Invalid").bytes().is_err());
    }
}
