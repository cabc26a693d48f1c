//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_TTL;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for persisted entries, created if missing
    pub directory: PathBuf,
    /// TTL applied when `set` is called without one
    pub default_ttl: Duration,
    /// Copy durable hits into the memory tier
    pub promote_disk_hits: bool,
}

impl Config {
    /// Creates a Config for the given directory with default settings.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    /// Overrides the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Enables or disables promotion of durable hits into memory.
    pub fn with_promote_disk_hits(mut self, promote: bool) -> Self {
        self.promote_disk_hits = promote;
        self
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DIRECTORY` - Cache root directory (default: `<tmp>/tiered_cache`)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 60000)
    /// - `CACHE_PROMOTE_DISK_HITS` - `true` or `1` to promote durable hits (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            directory: env::var("CACHE_DIRECTORY")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.directory),
            default_ttl: env::var("CACHE_DEFAULT_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.default_ttl),
            promote_disk_hits: env::var("CACHE_PROMOTE_DISK_HITS")
                .ok()
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
                .unwrap_or(defaults.promote_disk_hits),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: env::temp_dir().join("tiered_cache"),
            default_ttl: DEFAULT_TTL,
            promote_disk_hits: false,
        }
    }
}
