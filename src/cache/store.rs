//! Cache Store Module
//!
//! Main cache engine combining the memory tier and the durable tier with
//! lazy TTL expiration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::durable::{DurableRead, DurableTier};
use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheEntry, CacheKey, CacheStats, Clock, MemoryTier, SystemClock};
use crate::config::Config;
use crate::error::Result;

// == Cache ==
/// Two-tier key-value cache with TTL expiration.
///
/// Writes land in both tiers. Reads try memory first and fall back to the
/// compressed file on disk. Expired entries are removed from both tiers when
/// a read discovers them; nothing sweeps in the background, so files for keys
/// that are never read again stay on disk until `delete` or `clear`.
///
/// Instances sharing a directory share durable state but not memory: a
/// `delete` on one does not evict another's in-memory copy.
#[derive(Debug)]
pub struct Cache {
    /// Process-local fast path
    memory: MemoryTier,
    /// Compressed files on disk
    durable: DurableTier,
    /// TTL for `set` calls without an explicit one
    default_ttl: Duration,
    /// Copy durable hits into memory
    promote_disk_hits: bool,
    /// Time source for expiry
    clock: Arc<dyn Clock>,
    /// Read/write counters
    stats: StatsRecorder,
}

impl Cache {
    // == Constructor ==
    /// Creates a cache rooted at `directory`, creating it if absent.
    ///
    /// # Arguments
    /// * `directory` - Root path for persisted entries
    /// * `default_ttl` - TTL used when `set` is given none
    pub fn new(directory: impl Into<PathBuf>, default_ttl: Duration) -> Result<Self> {
        Self::from_config(&Config::new(directory).with_default_ttl(default_ttl))
    }

    /// Creates a cache from configuration using the system clock.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache from configuration with an explicit time source.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let durable = DurableTier::open(&config.directory)?;
        let default_ttl_ms = u64::try_from(config.default_ttl.as_millis()).unwrap_or(u64::MAX);

        info!(
            directory = %durable.directory().display(),
            default_ttl_ms,
            "Cache initialized"
        );

        Ok(Self {
            memory: MemoryTier::new(),
            durable,
            default_ttl: config.default_ttl,
            promote_disk_hits: config.promote_disk_hits,
            clock,
            stats: StatsRecorder::default(),
        })
    }

    // == Get ==
    /// Retrieves the value for `key`.
    ///
    /// Returns `None` when the key is absent, expired, or its file cannot be
    /// decoded. Never fails.
    pub async fn get(&self, key: impl Into<CacheKey>) -> Option<Value> {
        let id = key.into().normalize();

        if let Some(entry) = self.memory.lookup(&id).await {
            return if self.check_expired(&id, &entry).await {
                None
            } else {
                debug!(key = %id, "Memory hit");
                self.stats.record_memory_hit();
                Some(entry.value)
            };
        }

        match self.durable.read(&id).await {
            DurableRead::Hit(entry) => {
                if self.check_expired(&id, &entry).await {
                    return None;
                }

                debug!(key = %id, "Disk hit");
                self.stats.record_disk_hit();
                if self.promote_disk_hits {
                    self.memory.store(id, entry.clone()).await;
                }
                Some(entry.value)
            }
            DurableRead::Miss => {
                debug!(key = %id, "Miss");
                self.stats.record_miss();
                None
            }
            DurableRead::Unreadable(reason) => {
                warn!(
                    key = %id,
                    path = %self.durable.path_for(&id).display(),
                    error = %reason,
                    "Unreadable cache file treated as miss"
                );
                self.stats.record_miss();
                None
            }
        }
    }

    /// Retrieves the value for `key` decoded as `T`.
    ///
    /// A stored value that does not decode as `T` is reported as a miss.
    pub async fn get_as<T: DeserializeOwned>(&self, key: impl Into<CacheKey>) -> Option<T> {
        let key = key.into();
        let value = self.get(&key).await?;

        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!(key = %key.normalize(), error = %e, "Cached value has unexpected shape");
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// The memory tier is updated before the file is written; the call
    /// completes once the compressed file is on disk.
    ///
    /// # Arguments
    /// * `key` - Text or structured key
    /// * `value` - Any JSON-representable value
    /// * `ttl` - Time to release (uses the default TTL if None)
    pub async fn set<V: Serialize + ?Sized>(
        &self,
        key: impl Into<CacheKey>,
        value: &V,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let id = key.into().normalize();
        let value = serde_json::to_value(value)?;
        let entry = CacheEntry::new(
            value,
            self.clock.now_ms(),
            ttl.unwrap_or(self.default_ttl),
        );

        self.memory.store(id.clone(), entry.clone()).await;
        self.durable.write(&id, &entry).await?;
        self.stats.record_write();

        debug!(key = %id, expires_at = entry.expires_at, "Stored entry");
        Ok(())
    }

    // == Delete ==
    /// Removes `key` from both tiers. Never fails.
    pub async fn delete(&self, key: impl Into<CacheKey>) {
        let id = key.into().normalize();
        self.remove(&id).await;
        debug!(key = %id, "Deleted entry");
    }

    // == Clear ==
    /// Empties both tiers, leaving an empty directory behind.
    ///
    /// The memory tier is cleared first; if removing the directory fails the
    /// error is returned with memory already empty.
    pub async fn clear(&self) -> Result<()> {
        self.memory.clear_all().await;
        self.durable.clear().await?;

        info!(directory = %self.durable.directory().display(), "Cache cleared");
        Ok(())
    }

    // == Introspection ==
    /// Path of the file that holds (or would hold) `key`.
    pub fn filename_for(&self, key: impl Into<CacheKey>) -> PathBuf {
        self.durable.path_for(&key.into().normalize())
    }

    /// Root directory of the durable tier.
    pub fn directory(&self) -> &Path {
        self.durable.directory()
    }

    /// TTL applied when `set` is given none.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Number of entries held in memory, including not yet evicted expired ones.
    pub async fn memory_len(&self) -> usize {
        self.memory.len().await
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Internals ==
    /// Returns true if `entry` has expired, evicting it from both tiers.
    ///
    /// A newer entry stored for `id` since `entry` was read is left alone,
    /// along with its file.
    async fn check_expired(&self, id: &str, entry: &CacheEntry) -> bool {
        if !entry.is_expired_at(self.clock.now_ms()) {
            return false;
        }

        self.stats.record_miss();
        if self
            .memory
            .evict_if_current(id, entry, self.unlink(id))
            .await
        {
            debug!(key = %id, expires_at = entry.expires_at, "Evicted expired entry");
            self.stats.record_expiration();
        } else {
            debug!(key = %id, "Expired entry already replaced");
        }
        true
    }

    async fn remove(&self, id: &str) {
        self.memory.remove(id).await;
        self.unlink(id).await;
    }

    async fn unlink(&self, id: &str) {
        if let Err(e) = self.durable.delete(id).await {
            warn!(
                key = %id,
                path = %self.durable.path_for(id).display(),
                error = %e,
                "Failed to remove cache file"
            );
        }
    }
}
