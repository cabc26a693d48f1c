//! Durable Tier Module
//!
//! One gzip-compressed JSON file per entry, named by normalized identifier.
//!
//! Writes go straight to the final path with no temp-file rename, so two
//! concurrent writers of the same identifier can interleave and the last one
//! to finish wins.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::cache::{CacheEntry, FILE_EXTENSION};
use crate::error::{CacheError, Result};

// == Read Outcome ==
/// Result of reading one entry from disk.
#[derive(Debug)]
pub enum DurableRead {
    /// File decoded into an entry (expiry not yet checked)
    Hit(CacheEntry),
    /// No file for this identifier
    Miss,
    /// File present but could not be read back
    Unreadable(ReadFailure),
}

/// Why a durable read failed.
#[derive(Debug, thiserror::Error)]
pub enum ReadFailure {
    /// File exists but could not be opened
    #[error("open failed: {0}")]
    Open(#[source] io::Error),
    /// Gzip stream corrupt or truncated
    #[error("decompression failed: {0}")]
    Decompress(#[source] io::Error),
    /// Decompressed bytes are not a valid entry
    #[error("invalid entry JSON: {0}")]
    Parse(#[source] serde_json::Error),
    /// Blocking read task panicked or was cancelled
    #[error("worker failed: {0}")]
    Worker(String),
}

// == Durable Tier ==
/// Compressed on-disk storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct DurableTier {
    directory: PathBuf,
}

impl DurableTier {
    // == Constructor ==
    /// Opens the tier, creating `directory` (and parents) if missing.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|source| CacheError::DirectoryCreation {
            path: directory.clone(),
            source,
        })?;

        Ok(Self { directory })
    }

    /// Root directory of the tier.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File path for a normalized identifier.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.directory.join(format!("{}{}", id, FILE_EXTENSION))
    }

    // == Write ==
    /// Serializes, compresses and writes an entry, replacing any previous file.
    pub async fn write(&self, id: &str, entry: &CacheEntry) -> Result<()> {
        let path = self.path_for(id);
        let json = serde_json::to_vec(entry)?;

        let task_path = path.clone();
        let written = tokio::task::spawn_blocking(move || write_compressed(&task_path, &json))
            .await
            .map_err(|e| CacheError::Internal(format!("durable write task failed: {}", e)))?;

        written.map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "Wrote cache file");
        Ok(())
    }

    // == Read ==
    /// Reads and decodes the entry for `id`.
    ///
    /// Never returns an error; failures are reported as `Unreadable`.
    pub async fn read(&self, id: &str) -> DurableRead {
        let path = self.path_for(id);

        match tokio::task::spawn_blocking(move || read_compressed(&path)).await {
            Ok(outcome) => outcome,
            Err(e) => DurableRead::Unreadable(ReadFailure::Worker(e.to_string())),
        }
    }

    // == Delete ==
    /// Removes the file for `id`. A missing file is not an error.
    pub async fn delete(&self, id: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    // == Clear ==
    /// Removes the whole directory tree and recreates it empty.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.directory).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                return Err(CacheError::Clear {
                    path: self.directory.clone(),
                    source: e,
                });
            }
            _ => {}
        }

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| CacheError::DirectoryCreation {
                path: self.directory.clone(),
                source,
            })
    }
}

// == Utility Functions ==
fn write_compressed(path: &Path, json: &[u8]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(json)?;
    let mut file = encoder.finish()?;
    file.flush()
}

fn read_compressed(path: &Path) -> DurableRead {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return DurableRead::Miss,
        Err(e) => return DurableRead::Unreadable(ReadFailure::Open(e)),
    };

    let mut json = Vec::new();
    if let Err(e) = GzDecoder::new(file).read_to_end(&mut json) {
        return DurableRead::Unreadable(ReadFailure::Decompress(e));
    }

    match serde_json::from_slice(&json) {
        Ok(entry) => DurableRead::Hit(entry),
        Err(e) => DurableRead::Unreadable(ReadFailure::Parse(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn tier() -> (TempDir, DurableTier) {
        let dir = TempDir::new().unwrap();
        let tier = DurableTier::open(dir.path().join("store")).unwrap();
        (dir, tier)
    }

    #[test]
    fn test_open_creates_nested_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("a").join("b");

        DurableTier::open(&root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_path_for() {
        let tier = DurableTier {
            directory: PathBuf::from("/tmp/cache"),
        };
        assert_eq!(
            tier.path_for("testkey"),
            PathBuf::from("/tmp/cache/testkey.json.gz")
        );
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_dir, tier) = tier();
        let entry = CacheEntry::new(json!({"a": 123}), 0, Duration::from_secs(60));

        tier.write("k", &entry).await.unwrap();

        match tier.read("k").await {
            DurableRead::Hit(read) => assert_eq!(read, entry),
            other => panic!("expected hit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_file_is_gzipped_json() {
        let (_dir, tier) = tier();
        let entry = CacheEntry::new(json!([1, 2]), 100, Duration::from_millis(50));
        tier.write("k", &entry).await.unwrap();

        let raw = std::fs::read(tier.path_for("k")).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b], "gzip magic bytes");

        let mut json = String::new();
        GzDecoder::new(&raw[..]).read_to_string(&mut json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, json!({"expires": 150, "value": [1, 2]}));
    }

    #[tokio::test]
    async fn test_read_missing_is_miss() {
        let (_dir, tier) = tier();
        assert!(matches!(tier.read("missing").await, DurableRead::Miss));
    }

    #[tokio::test]
    async fn test_read_corrupt_gzip_is_unreadable() {
        let (_dir, tier) = tier();
        std::fs::write(tier.path_for("bad"), b"definitely not gzip").unwrap();

        assert!(matches!(
            tier.read("bad").await,
            DurableRead::Unreadable(ReadFailure::Decompress(_))
        ));
    }

    #[tokio::test]
    async fn test_read_invalid_json_is_unreadable() {
        let (_dir, tier) = tier();
        write_compressed(&tier.path_for("bad"), b"{\"expires\": oops").unwrap();

        assert!(matches!(
            tier.read("bad").await,
            DurableRead::Unreadable(ReadFailure::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let (_dir, tier) = tier();
        tier.delete("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_recreates_empty_directory() {
        let (_dir, tier) = tier();
        let entry = CacheEntry::new(json!(1), 0, Duration::from_secs(60));
        tier.write("a", &entry).await.unwrap();
        tier.write("b", &entry).await.unwrap();

        tier.clear().await.unwrap();

        assert!(tier.directory().is_dir());
        assert_eq!(std::fs::read_dir(tier.directory()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_write_into_removed_directory_fails() {
        let (_dir, tier) = tier();
        std::fs::remove_dir_all(tier.directory()).unwrap();

        let entry = CacheEntry::new(json!(1), 0, Duration::from_secs(60));
        let result = tier.write("k", &entry).await;
        assert!(matches!(result, Err(CacheError::Write { .. })));
    }
}
