//! Base64 helpers for x402 header payloads.
//!
//! Authorizations and receipts travel in HTTP headers as standard base64 of
//! their JSON serialization.

use std::fmt::{self, Display, Formatter};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Base64 text held as bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes(pub Vec<u8>);

impl Base64Bytes {
    /// Decodes the base64 text into raw bytes.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(self.0.trim_ascii())
    }

    /// Encodes raw bytes as base64 text.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Self {
        Self(b64.encode(input.as_ref()).into_bytes())
    }

    /// Serializes `value` as JSON and base64-encodes it.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_vec(value)?;
        Ok(Self::encode(json))
    }

    /// Decodes base64 text and parses the bytes as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`JsonHeaderError`] if either step fails.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, JsonHeaderError> {
        let bytes = self.decode()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Failure to decode a base64 JSON header value.
#[derive(Debug, thiserror::Error)]
pub enum JsonHeaderError {
    /// Not base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// Base64 decoded, but the content is not the expected JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl AsRef<[u8]> for Base64Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Base64Bytes {
    fn from(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }
}

impl From<&str> for Base64Bytes {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl Display for Base64Bytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json_trims_whitespace() {
        let encoded = Base64Bytes::encode_json(&json!({"success": true})).unwrap();
        let padded = Base64Bytes::from(format!("  {encoded}\n").as_str());
        let value: serde_json::Value = padded.decode_json().unwrap();
        assert_eq!(value["success"], true);
    }

    #[test]
    fn test_decode_json_rejects_non_base64() {
        let err = Base64Bytes::from("not base64!").decode_json::<serde_json::Value>();
        assert!(matches!(err, Err(JsonHeaderError::Base64(_))));
    }

    #[test]
    fn test_decode_json_rejects_non_json() {
        let encoded = Base64Bytes::encode("plain text");
        let err = encoded.decode_json::<serde_json::Value>();
        assert!(matches!(err, Err(JsonHeaderError::Json(_))));
    }
}
