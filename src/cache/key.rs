//! Cache Key Module
//!
//! Turns caller-supplied keys into stable identifiers that double as
//! memory-index keys and file base names.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Longest text key that is used verbatim as a file name.
pub const MAX_PLAIN_KEY_LENGTH: usize = 200;

// == Cache Key ==
/// Logical identity of a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    /// Opaque string key
    Text(String),
    /// Any JSON structure (mapping, sequence, or nested combination)
    Structured(Value),
}

impl CacheKey {
    /// Builds a structured key from any serializable value.
    ///
    /// A value that serializes to a JSON string becomes a `Text` key.
    pub fn structured<T: Serialize + ?Sized>(key: &T) -> Result<Self> {
        Ok(match serde_json::to_value(key)? {
            Value::String(s) => Self::Text(s),
            other => Self::Structured(other),
        })
    }

    // == Normalize ==
    /// Returns the normalized identifier for this key.
    ///
    /// Text keys that are safe file names pass through unchanged. Everything
    /// else becomes the URL-safe base64 SHA-256 digest of its compact JSON
    /// form (43 characters). JSON objects keep their keys sorted, so member
    /// order does not affect the result.
    pub fn normalize(&self) -> String {
        match self {
            Self::Text(s) if is_safe_file_name(s) => s.clone(),
            Self::Text(s) => digest(&Value::String(s.clone())),
            Self::Structured(value) => digest(value),
        }
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::Text(key.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self::Text(key)
    }
}

impl From<&String> for CacheKey {
    fn from(key: &String) -> Self {
        Self::Text(key.clone())
    }
}

impl From<Value> for CacheKey {
    fn from(key: Value) -> Self {
        match key {
            Value::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }
}

impl From<&CacheKey> for CacheKey {
    fn from(key: &CacheKey) -> Self {
        key.clone()
    }
}

// == Utility Functions ==
fn digest(value: &Value) -> String {
    // Display for Value is the compact serialization and cannot fail
    let serialized = value.to_string();
    let hash = Sha256::digest(serialized.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

fn is_safe_file_name(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_PLAIN_KEY_LENGTH
        && s != "."
        && s != ".."
        && !s
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '\0' || c.is_control())
}
