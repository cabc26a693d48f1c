//! Cache Module
//!
//! Provides a two-tier cache: an in-memory map in front of gzip-compressed
//! JSON files, with lazy TTL expiration.

mod clock;
mod durable;
mod entry;
mod key;
mod memory;
mod stats;
mod store;


use std::time::Duration;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use durable::{DurableRead, DurableTier, ReadFailure};
pub use entry::CacheEntry;
pub use key::{CacheKey, MAX_PLAIN_KEY_LENGTH};
pub use memory::MemoryTier;
pub use stats::CacheStats;
pub use store::Cache;

// == Public Constants ==
/// TTL applied when none is configured
pub const DEFAULT_TTL: Duration = Duration::from_millis(60_000);

/// Suffix of every durable file: gzip-compressed JSON
pub const FILE_EXTENSION: &str = ".json.gz";
