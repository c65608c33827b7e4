//! SQLite cache backend for persistent storage.

use super::{unix_seconds, CacheBackend, CacheEntry, CacheStats};
use crate::core::media::MediaKind;
use crate::core::metadata::MetadataMap;
use crate::error::CacheError;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// SQLite-backed persistent cache.
///
/// The connection lock is held for one statement (or one batch transaction)
/// at a time. WAL mode lets readers proceed during writes.
pub struct SqliteCache {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteCache {
    /// Open or create a cache database at the given path
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| CacheError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             CREATE TABLE IF NOT EXISTS metadata (
                path TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                file_modified INTEGER NOT NULL,
                cached_at INTEGER NOT NULL
             );",
        )
        .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        tracing::debug!("Opened metadata cache at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    fn from_timestamp(timestamp: i64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(timestamp.max(0) as u64)
    }

    fn kind_to_str(kind: MediaKind) -> &'static str {
        kind.prefix()
    }

    fn kind_from_str(value: &str) -> MediaKind {
        MediaKind::from_prefix(value).unwrap_or(MediaKind::Image)
    }

    fn encode(metadata: &MetadataMap) -> Result<String, CacheError> {
        serde_json::to_string(metadata).map_err(|e| CacheError::SerializationFailed(e.to_string()))
    }

    fn insert(conn: &Connection, entry: &CacheEntry) -> Result<(), CacheError> {
        conn.execute(
            "INSERT OR REPLACE INTO metadata
             (path, kind, payload, file_size, file_modified, cached_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                entry.path.to_string_lossy(),
                Self::kind_to_str(entry.kind),
                Self::encode(&entry.metadata)?,
                entry.file_size as i64,
                unix_seconds(entry.file_modified),
                unix_seconds(entry.cached_at),
            ],
        )
        .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
        Ok(())
    }
}

impl CacheBackend for SqliteCache {
    fn get(
        &self,
        path: &Path,
        current_size: u64,
        current_modified: SystemTime,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let row = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT kind, payload, file_size, file_modified, cached_at
                 FROM metadata WHERE path = ?",
                [path.to_string_lossy()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
        };

        let (kind, payload, size, modified, cached_at) = match row {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(CacheError::QueryFailed(e.to_string())),
        };

        let metadata: MetadataMap = match serde_json::from_str(&payload) {
            Ok(metadata) => metadata,
            Err(e) => {
                // An unreadable row is a miss; it will be overwritten
                tracing::warn!("Ignoring unreadable cache entry for {}: {}", path.display(), e);
                return Ok(None);
            }
        };

        let entry = CacheEntry {
            path: path.to_path_buf(),
            kind: Self::kind_from_str(&kind),
            metadata,
            file_size: size as u64,
            file_modified: Self::from_timestamp(modified),
            cached_at: Self::from_timestamp(cached_at),
        };

        Ok(entry
            .is_valid_for(current_size, current_modified)
            .then_some(entry))
    }

    fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let conn = self.lock()?;
        Self::insert(&conn, &entry)
    }

    fn set_batch(&self, entries: &[CacheEntry]) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
        for entry in entries {
            Self::insert(&tx, entry)?;
        }
        tx.commit()
            .map_err(|e| CacheError::QueryFailed(e.to_string()))
    }

    fn remove(&self, path: &Path) -> Result<(), CacheError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM metadata WHERE path = ?", [path.to_string_lossy()])
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM metadata", [])
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        let conn = self.lock()?;

        conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN payload = '{\"values\":{}}' THEN 1 ELSE 0 END), 0),
                    MIN(cached_at),
                    MAX(cached_at)
             FROM metadata",
            [],
            |row| {
                Ok(CacheStats {
                    total_entries: row.get::<_, i64>(0)? as usize,
                    empty_entries: row.get::<_, i64>(1)? as usize,
                    oldest_entry: row.get::<_, Option<i64>>(2)?.map(Self::from_timestamp),
                    newest_entry: row.get::<_, Option<i64>>(3)?.map(Self::from_timestamp),
                })
            },
        )
        .map_err(|e| CacheError::QueryFailed(e.to_string()))
    }

    fn prune_orphans(&self) -> Result<usize, CacheError> {
        let paths: Vec<String> = {
            let conn = self.lock()?;
            let mut stmt = conn
                .prepare("SELECT path FROM metadata")
                .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| row.get(0))
                .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
            rows.filter_map(|r| r.ok()).collect()
        };

        let mut count = 0;
        for path in paths.into_iter().filter(|p| !Path::new(p).exists()) {
            let conn = self.lock()?;
            conn.execute("DELETE FROM metadata WHERE path = ?", [&path])
                .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
            count += 1;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::MetaAttribute;
    use tempfile::TempDir;

    fn whole_seconds(time: SystemTime) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(unix_seconds(time) as u64)
    }

    fn create_entry(path: &str) -> CacheEntry {
        CacheEntry::new(
            PathBuf::from(path),
            MediaKind::Video,
            MetadataMap::from_pairs([
                (MetaAttribute::CreatedAt, "2021:07:14 09:30:05"),
                (MetaAttribute::MajorBrand, "qt"),
            ]),
            1000,
            whole_seconds(SystemTime::now()),
        )
    }

    #[test]
    fn sqlite_cache_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested/cache.db");

        let cache = SqliteCache::open(&db_path).unwrap();

        assert!(db_path.exists());
        assert_eq!(cache.stats().unwrap().total_entries, 0);
    }

    #[test]
    fn sqlite_cache_stores_and_retrieves() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SqliteCache::open(&temp_dir.path().join("cache.db")).unwrap();

        let entry = create_entry("/videos/clip.mov");
        let modified = entry.file_modified;
        cache.set(entry.clone()).unwrap();

        let result = cache
            .get(Path::new("/videos/clip.mov"), 1000, modified)
            .unwrap()
            .unwrap();
        assert_eq!(result.kind, MediaKind::Video);
        assert_eq!(result.metadata, entry.metadata);
    }

    #[test]
    fn sqlite_cache_invalidates_on_modification() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SqliteCache::open(&temp_dir.path().join("cache.db")).unwrap();

        let entry = create_entry("/videos/clip.mov");
        let later = entry.file_modified + Duration::from_secs(60);
        cache.set(entry).unwrap();

        assert!(cache.get(Path::new("/videos/clip.mov"), 1000, later).unwrap().is_none());
    }

    #[test]
    fn batch_insert_and_stats() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SqliteCache::open(&temp_dir.path().join("cache.db")).unwrap();

        let mut empty = create_entry("/c.png");
        empty.metadata = MetadataMap::default();
        cache
            .set_batch(&[create_entry("/a.mov"), create_entry("/b.mov"), empty])
            .unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.empty_entries, 1);
        assert!(stats.newest_entry.is_some());
    }

    #[test]
    fn entries_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("cache.db");
        let entry = create_entry("/a.mov");
        let modified = entry.file_modified;

        SqliteCache::open(&db_path).unwrap().set(entry).unwrap();

        let reopened = SqliteCache::open(&db_path).unwrap();
        assert!(reopened.get(Path::new("/a.mov"), 1000, modified).unwrap().is_some());
    }

    #[test]
    fn sqlite_cache_clears_and_prunes() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SqliteCache::open(&temp_dir.path().join("cache.db")).unwrap();

        let real = temp_dir.path().join("real.jpg");
        std::fs::write(&real, b"x").unwrap();
        cache.set(create_entry(&real.to_string_lossy())).unwrap();
        cache.set(create_entry("/gone/a.mov")).unwrap();

        assert_eq!(cache.prune_orphans().unwrap(), 1);
        assert_eq!(cache.stats().unwrap().total_entries, 1);

        cache.clear().unwrap();
        assert_eq!(cache.stats().unwrap().total_entries, 0);
    }
}
