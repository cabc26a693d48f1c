//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Only the write path,
//! the clear path and construction produce errors; reads are fail-open.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache directory could not be created
    #[error("Failed to create cache directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing a compressed entry to disk failed
    #[error("Failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Removing the cache directory failed
    #[error("Failed to clear cache directory {path}: {source}")]
    Clear {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A value or key could not be represented as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking worker failed to complete
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_error_mentions_path() {
        let err = CacheError::Write {
            path: PathBuf::from("/tmp/cache/abc.json.gz"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };

        let message = err.to_string();
        assert!(message.contains("/tmp/cache/abc.json.gz"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_serialization_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CacheError = serde_err.into();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
