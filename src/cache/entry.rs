//! Cache Entry Module
//!
//! Defines the unit of storage shared by both tiers and the expiration policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A stored value with its absolute expiry.
///
/// Serialized on disk as `{"expires": <epoch-ms>, "value": <any JSON>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Expiration timestamp (Unix milliseconds)
    #[serde(rename = "expires")]
    pub expires_at: u64,
    /// The stored value
    pub value: Value,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry that expires `ttl` after `now_ms`.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `now_ms` - Current time in Unix milliseconds
    /// * `ttl` - Time to release
    pub fn new(value: Value, now_ms: u64, ttl: Duration) -> Self {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);

        Self {
            expires_at: now_ms.saturating_add(ttl_ms),
            value,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry stays valid through its expiry instant and is expired only
    /// once `now_ms` has moved past `expires_at`.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expires_at < now_ms
    }
}
