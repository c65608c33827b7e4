//! # Cache Module
//!
//! Persists extracted metadata so unchanged files are not probed again.
//!
//! Entries are keyed by absolute path and invalidated when the file size or
//! modification time (second precision) changes.
//!
//! ## Backends
//! - `SqliteCache` - persistent storage in a single SQLite file
//! - `InMemoryCache` - sharded map for tests and `--no-cache` runs

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryCache;
pub use sqlite::SqliteCache;
pub use traits::CacheBackend;

use crate::core::media::MediaKind;
use crate::core::metadata::MetadataMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata of one file as it was when cached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub metadata: MetadataMap,
    /// File size at time of extraction
    pub file_size: u64,
    /// File modification time at time of extraction
    pub file_modified: SystemTime,
    pub cached_at: SystemTime,
}

impl CacheEntry {
    pub fn new(
        path: PathBuf,
        kind: MediaKind,
        metadata: MetadataMap,
        file_size: u64,
        file_modified: SystemTime,
    ) -> Self {
        Self {
            path,
            kind,
            metadata,
            file_size,
            file_modified,
            cached_at: SystemTime::now(),
        }
    }

    /// Check if this entry still describes the file
    pub fn is_valid_for(&self, file_size: u64, file_modified: SystemTime) -> bool {
        // SQLite stores seconds
        self.file_size == file_size && unix_seconds(self.file_modified) == unix_seconds(file_modified)
    }
}

pub(crate) fn unix_seconds(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    /// Entries whose metadata map is empty
    pub empty_entries: usize,
    pub oldest_entry: Option<SystemTime>,
    pub newest_entry: Option<SystemTime>,
}

/// Default on-disk location of the cache
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("media-organizer")
        .join("metadata.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::MetaAttribute;
    use std::time::Duration;

    fn entry(modified: SystemTime) -> CacheEntry {
        CacheEntry::new(
            PathBuf::from("/test.jpg"),
            MediaKind::Image,
            MetadataMap::from_pairs([(MetaAttribute::Model, "Canon")]),
            1000,
            modified,
        )
    }

    #[test]
    fn entry_valid_when_unchanged() {
        let now = SystemTime::now();
        assert!(entry(now).is_valid_for(1000, now));
    }

    #[test]
    fn entry_invalid_when_size_changed() {
        let now = SystemTime::now();
        assert!(!entry(now).is_valid_for(2000, now));
    }

    #[test]
    fn entry_invalid_when_modified() {
        let now = SystemTime::now();
        assert!(!entry(now).is_valid_for(1000, now + Duration::from_secs(60)));
    }

    #[test]
    fn sub_second_difference_is_ignored() {
        let base = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert!(entry(base).is_valid_for(1000, base + Duration::from_millis(300)));
    }

    #[test]
    fn default_path_is_named_after_tool() {
        let path = default_cache_path();
        assert!(path.ends_with("media-organizer/metadata.db"));
    }
}
