//! Request/response body utilities.
//!
//! Request bodies are opaque [`Bytes`]; response bodies are decoded by the
//! backend according to the [`ResponseType`] the caller asked for.

use bytes::Bytes;
use derive_more::Display;

use crate::Result;

/// Prefix some servers prepend to JSON payloads to defeat XSSI.
const XSSI_PREFIX: &[u8] = b")]}'\n";

/// How the caller wants the response body decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum ResponseType {
    /// Parse the body as JSON.
    #[default]
    #[display("json")]
    Json,
    /// Decode the body as UTF-8 text.
    #[display("text")]
    Text,
    /// Keep the raw bytes, typed as a blob.
    #[display("blob")]
    Blob,
    /// Keep the raw bytes.
    #[display("arraybuffer")]
    ArrayBuffer,
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseBody {
    /// No body was received (or an empty JSON body).
    #[default]
    Empty,
    /// Parsed JSON value.
    Json(serde_json::Value),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes, for `blob` and `arraybuffer` response types.
    Binary(Bytes),
}

impl ResponseBody {
    /// Decode raw transport bytes according to `response_type`.
    ///
    /// Text is decoded lossily and never fails. JSON accepts an empty body
    /// (yielding [`ResponseBody::Empty`]) and strips the XSSI prefix.
    ///
    /// # Errors
    ///
    /// Returns the parser error when a JSON body is malformed.
    pub fn decode(bytes: &Bytes, response_type: ResponseType) -> serde_json::Result<Self> {
        match response_type {
            ResponseType::Json => {
                let payload = bytes.strip_prefix(XSSI_PREFIX).unwrap_or(bytes.as_ref());
                if payload.iter().all(u8::is_ascii_whitespace) {
                    return Ok(Self::Empty);
                }
                serde_json::from_slice(payload).map(Self::Json)
            }
            ResponseType::Text => Ok(Self::Text(String::from_utf8_lossy(bytes).into_owned())),
            ResponseType::Blob | ResponseType::ArrayBuffer => Ok(Self::Binary(bytes.clone())),
        }
    }

    /// Returns `true` for [`ResponseBody::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The JSON value, if the body was decoded as JSON.
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The text, if the body was decoded as text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The raw bytes, if the body was kept as binary.
    #[must_use]
    pub const fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use interpose_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

/// Deserialize an already-parsed JSON value, keeping the failing path.
///
/// # Errors
///
/// Returns an error if the value does not match `T`.
pub fn from_value<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}
