//! Cache backend trait definition.

use super::{CacheEntry, CacheStats};
use crate::error::CacheError;
use std::path::Path;
use std::time::SystemTime;

/// Trait for metadata cache backends
pub trait CacheBackend: Send + Sync {
    /// Get cached metadata if present and still valid.
    ///
    /// Entries for files whose size or modification time changed are
    /// treated as missing.
    fn get(
        &self,
        path: &Path,
        current_size: u64,
        current_modified: SystemTime,
    ) -> Result<Option<CacheEntry>, CacheError>;

    fn set(&self, entry: CacheEntry) -> Result<(), CacheError>;

    /// Store several entries at once
    fn set_batch(&self, entries: &[CacheEntry]) -> Result<(), CacheError> {
        for entry in entries {
            self.set(entry.clone())?;
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), CacheError>;

    fn clear(&self) -> Result<(), CacheError>;

    fn stats(&self) -> Result<CacheStats, CacheError>;

    /// Remove entries for files that no longer exist.
    ///
    /// Returns the number of entries removed.
    fn prune_orphans(&self) -> Result<usize, CacheError>;
}
