//! Memory Tier Module
//!
//! Process-local fast path keyed by normalized identifier.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::RwLock;

use crate::cache::CacheEntry;

// == Memory Tier ==
/// In-process map from normalized identifier to entry.
///
/// Lost on drop; never persisted.
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryTier {
    // == Constructor ==
    /// Creates an empty memory tier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the entry for `id`, if any.
    pub async fn lookup(&self, id: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(id).cloned()
    }

    /// Stores an entry, replacing any previous one.
    pub async fn store(&self, id: String, entry: CacheEntry) {
        self.entries.write().await.insert(id, entry);
    }

    /// Removes the entry for `id`. No-op if absent.
    pub async fn remove(&self, id: &str) -> Option<CacheEntry> {
        self.entries.write().await.remove(id)
    }

    /// Evicts `stale` from the tier unless a newer entry replaced it.
    ///
    /// `cleanup` runs while the tier is still write-locked, so a concurrent
    /// store for the same id cannot slip in between the check and the
    /// cleanup. Returns false, without running `cleanup`, when the id now
    /// holds a different entry.
    pub async fn evict_if_current<F>(&self, id: &str, stale: &CacheEntry, cleanup: F) -> bool
    where
        F: Future<Output = ()>,
    {
        let mut entries = self.entries.write().await;
        match entries.get(id) {
            Some(current) if current != stale => false,
            _ => {
                entries.remove(id);
                cleanup.await;
                true
            }
        }
    }

    /// Drops every entry.
    pub async fn clear_all(&self) {
        self.entries.write().await.clear();
    }

    /// Returns the number of entries held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if no entries are held.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn entry(value: serde_json::Value) -> CacheEntry {
        CacheEntry::new(value, 0, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_store_and_lookup() {
        let tier = MemoryTier::new();
        tier.store("k".to_string(), entry(json!(1))).await;

        assert_eq!(tier.lookup("k").await, Some(entry(json!(1))));
        assert_eq!(tier.lookup("missing").await, None);
    }

    #[tokio::test]
    async fn test_store_overwrites() {
        let tier = MemoryTier::new();
        tier.store("k".to_string(), entry(json!("old"))).await;
        tier.store("k".to_string(), entry(json!("new"))).await;

        assert_eq!(tier.len().await, 1);
        assert_eq!(tier.lookup("k").await.unwrap().value, json!("new"));
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let tier = MemoryTier::new();
        assert!(tier.remove("missing").await.is_none());
        assert!(tier.is_empty().await);
    }

    #[tokio::test]
    async fn test_evict_if_current_removes_stale_entry() {
        let tier = MemoryTier::new();
        let stale = entry(json!("old"));
        tier.store("k".to_string(), stale.clone()).await;

        let mut cleaned = false;
        let evicted = tier
            .evict_if_current("k", &stale, async { cleaned = true })
            .await;

        assert!(evicted);
        assert!(cleaned);
        assert!(tier.lookup("k").await.is_none());
    }

    #[tokio::test]
    async fn test_evict_if_current_keeps_newer_entry() {
        let tier = MemoryTier::new();
        let stale = entry(json!("old"));
        tier.store("k".to_string(), entry(json!("new"))).await;

        let mut cleaned = false;
        let evicted = tier
            .evict_if_current("k", &stale, async { cleaned = true })
            .await;

        assert!(!evicted);
        assert!(!cleaned);
        assert_eq!(tier.lookup("k").await.unwrap().value, json!("new"));
    }

    #[tokio::test]
    async fn test_evict_if_current_absent_runs_cleanup() {
        let tier = MemoryTier::new();
        let stale = entry(json!("on disk only"));

        let mut cleaned = false;
        assert!(tier.evict_if_current("k", &stale, async { cleaned = true }).await);
        assert!(cleaned);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let tier = MemoryTier::new();
        tier.store("a".to_string(), entry(json!(1))).await;
        tier.store("b".to_string(), entry(json!(2))).await;

        tier.clear_all().await;
        assert!(tier.is_empty().await);
    }
}
