//! # Loader Module
//!
//! Turns discovered files into [`MediaFile`]s by reading their metadata.
//!
//! Files are processed in parallel. A valid cache entry skips the extractor
//! entirely; fresh results are written back in one batch at the end.

use crate::core::cache::{CacheBackend, CacheEntry};
use crate::core::media::{DiscoveredFile, MediaFile};
use crate::core::metadata::MetadataExtractor;
use crate::core::pipeline::CancellationToken;
use crate::error::FileError;
use crate::events::{Event, EventSender, MetadataEvent, MetadataProgress, ProgressCounter};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Outcome of loading a batch
#[derive(Debug, Default)]
pub struct LoadResult {
    /// Files with metadata (possibly empty), in input order
    pub files: Vec<MediaFile>,
    /// Files whose metadata could not be read at all
    pub errors: Vec<FileError>,
    pub cache_hits: usize,
    /// Files skipped because the run was cancelled
    pub cancelled: usize,
}

enum Loaded {
    File {
        file: MediaFile,
        fresh: Option<CacheEntry>,
    },
    Failed(FileError),
    Cancelled,
}

/// Reads metadata for many files at once
pub struct MediaLoader {
    extractor: Arc<dyn MetadataExtractor>,
    cache: Option<Arc<dyn CacheBackend>>,
}

impl MediaLoader {
    pub fn new(extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self {
            extractor,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn load(
        &self,
        discovered: &[DiscoveredFile],
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> LoadResult {
        events.send(Event::Metadata(MetadataEvent::Started {
            total_files: discovered.len(),
        }));

        let progress = ProgressCounter::new(discovered.len());
        let cache_hits = AtomicUsize::new(0);

        let outcomes: Vec<Loaded> = discovered
            .par_iter()
            .map(|item| {
                if cancel.is_cancelled() {
                    return Loaded::Cancelled;
                }

                let outcome = self.load_one(item, events, &cache_hits);

                events.send(Event::Metadata(MetadataEvent::Progress(MetadataProgress {
                    completed: progress.tick(),
                    total: progress.total(),
                    current_path: item.path.clone(),
                    cache_hits: cache_hits.load(Ordering::Relaxed),
                })));

                outcome
            })
            .collect();

        let mut result = LoadResult {
            cache_hits: cache_hits.into_inner(),
            ..Default::default()
        };
        let mut fresh_entries = Vec::new();

        for outcome in outcomes {
            match outcome {
                Loaded::File { file, fresh } => {
                    fresh_entries.extend(fresh);
                    result.files.push(file);
                }
                Loaded::Failed(e) => result.errors.push(e),
                Loaded::Cancelled => result.cancelled += 1,
            }
        }

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set_batch(&fresh_entries) {
                tracing::warn!("Failed to update metadata cache: {}", e);
            }
        }

        tracing::info!(
            "Loaded metadata for {} files ({} from cache, {} failed)",
            result.files.len(),
            result.cache_hits,
            result.errors.len()
        );

        events.send(Event::Metadata(MetadataEvent::Completed {
            total_loaded: result.files.len(),
            cache_hits: result.cache_hits,
        }));

        result
    }

    fn load_one(
        &self,
        item: &DiscoveredFile,
        events: &EventSender,
        cache_hits: &AtomicUsize,
    ) -> Loaded {
        if let Some(cache) = &self.cache {
            match cache.get(&item.path, item.size, item.modified) {
                Ok(Some(entry)) => {
                    tracing::debug!("Cache hit for {}", item.path.display());
                    cache_hits.fetch_add(1, Ordering::Relaxed);
                    return Loaded::File {
                        file: MediaFile::new(item.kind, item.path.clone(), entry.metadata),
                        fresh: None,
                    };
                }
                Ok(None) => {}
                Err(e) => tracing::debug!("Cache lookup failed for {}: {}", item.path.display(), e),
            }
        }

        let metadata = match self.extractor.extract(&item.path, item.kind) {
            Ok(metadata) => metadata,
            Err(e) => {
                events.send(Event::Metadata(MetadataEvent::Error {
                    path: item.path.clone(),
                    message: e.to_string(),
                }));
                return Loaded::Failed(FileError::Prepare {
                    path: item.path.clone(),
                    source: e,
                });
            }
        };

        if metadata.is_empty() {
            tracing::debug!("No metadata in {}", item.path.display());
            events.send(Event::Metadata(MetadataEvent::Unavailable {
                path: item.path.clone(),
            }));
        }

        let fresh = self.cache.as_ref().map(|_| {
            CacheEntry::new(
                item.path.clone(),
                item.kind,
                metadata.clone(),
                item.size,
                item.modified,
            )
        });

        Loaded::File {
            file: MediaFile::new(item.kind, item.path.clone(), metadata),
            fresh,
        }
    }
}
