//! In-memory cache backend, partitioned by path.

use super::{CacheBackend, CacheEntry, CacheStats};
use crate::error::CacheError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;
use xxhash_rust::xxh3::xxh3_64;

const SHARD_COUNT: usize = 16;

type Shard = RwLock<HashMap<PathBuf, CacheEntry>>;

/// In-memory cache backend.
///
/// Paths are spread over independent shards so parallel loaders rarely wait
/// on each other.
pub struct InMemoryCache {
    shards: Vec<Shard>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn shard_for(&self, path: &Path) -> &Shard {
        let key = xxh3_64(path.as_os_str().as_encoded_bytes());
        &self.shards[(key % SHARD_COUNT as u64) as usize]
    }

    fn read(shard: &Shard) -> Result<RwLockReadGuard<'_, HashMap<PathBuf, CacheEntry>>, CacheError> {
        shard.read().map_err(|_| CacheError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }

    fn write(shard: &Shard) -> Result<RwLockWriteGuard<'_, HashMap<PathBuf, CacheEntry>>, CacheError> {
        shard.write().map_err(|_| CacheError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryCache {
    fn get(
        &self,
        path: &Path,
        current_size: u64,
        current_modified: SystemTime,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let shard = Self::read(self.shard_for(path))?;
        Ok(shard
            .get(path)
            .filter(|entry| entry.is_valid_for(current_size, current_modified))
            .cloned())
    }

    fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let mut shard = Self::write(self.shard_for(&entry.path))?;
        shard.insert(entry.path.clone(), entry);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), CacheError> {
        Self::write(self.shard_for(path))?.remove(path);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        for shard in &self.shards {
            Self::write(shard)?.clear();
        }
        Ok(())
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        let mut stats = CacheStats::default();

        for shard in &self.shards {
            let shard = Self::read(shard)?;
            for entry in shard.values() {
                stats.total_entries += 1;
                if entry.metadata.is_empty() {
                    stats.empty_entries += 1;
                }
                stats.oldest_entry = Some(match stats.oldest_entry {
                    Some(t) => t.min(entry.cached_at),
                    None => entry.cached_at,
                });
                stats.newest_entry = Some(match stats.newest_entry {
                    Some(t) => t.max(entry.cached_at),
                    None => entry.cached_at,
                });
            }
        }

        Ok(stats)
    }

    fn prune_orphans(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for shard in &self.shards {
            let mut shard = Self::write(shard)?;
            let before = shard.len();
            shard.retain(|path, _| path.exists());
            removed += before - shard.len();
        }
        Ok(removed)
    }
}
