//! Tiered Cache - A hybrid in-memory and on-disk key-value cache
//!
//! Memoizes values across process restarts: each entry lives in an
//! in-process map and in a gzip-compressed JSON file, and expires after a
//! time-to-live.
//!
//! ```no_run
//! # async fn demo() -> tiered_cache::error::Result<()> {
//! use std::time::Duration;
//! use serde_json::json;
//! use tiered_cache::Cache;
//!
//! let cache = Cache::new("/tmp/c", Duration::from_secs(1))?;
//! cache.set("user:1", &json!({"name": "Ann"}), None).await?;
//! assert_eq!(cache.get("user:1").await, Some(json!({"name": "Ann"})));
//! cache.delete("user:1").await;
//! assert_eq!(cache.get("user:1").await, None);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{Cache, CacheKey, CacheStats, Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{CacheError, Result};
