//! Media organization module.
//!
//! Copies or moves media into a `<target>/<yyyy>/<MM>/` layout using the
//! capture date. Undated files land in the fallback folder.

mod executor;
mod planner;
mod types;

pub use executor::OrganizeExecutor;
pub use planner::OrganizePlanner;
pub use types::*;

use crate::core::cache::CacheBackend;
use crate::core::fs::{FileSystem, LocalFileSystem};
use crate::core::loader::MediaLoader;
use crate::core::metadata::{MediaMetadataExtractor, MetadataExtractor};
use crate::core::pipeline::{validate_roots, CancellationToken};
use crate::core::scanner::{MediaScanner, WalkDirScanner};
use crate::error::{OrganizerError, Result, ScanError};
use crate::events::{null_sender, Event, EventSender, PipelineEvent, PipelinePhase};
use std::sync::Arc;
use std::time::Instant;

/// Scans sources, reads dates and files everything under the target
pub struct Organizer {
    config: OrganizeConfig,
    extractor: Arc<dyn MetadataExtractor>,
    cache: Option<Arc<dyn CacheBackend>>,
    fs: Arc<dyn FileSystem>,
    cancel: CancellationToken,
}

impl Organizer {
    pub fn new(config: OrganizeConfig) -> Self {
        Self {
            config,
            extractor: Arc::new(MediaMetadataExtractor::detect()),
            cache: None,
            fs: Arc::new(LocalFileSystem),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn MetadataExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn run(&self) -> Result<OrganizeResult> {
        self.run_with_events(&null_sender())
    }

    pub fn run_with_events(&self, events: &EventSender) -> Result<OrganizeResult> {
        let sources = validate_roots(&self.config.sources)?;
        if self.config.target.as_os_str().is_empty() {
            return Err(OrganizerError::Config("no target directory given".to_string()));
        }
        if self.config.fallback.is_empty() || self.config.fallback.contains(['/', '\\']) {
            return Err(OrganizerError::Config(format!(
                "invalid fallback folder name: {:?}",
                self.config.fallback
            )));
        }
        let start = Instant::now();

        events.send(Event::Pipeline(PipelineEvent::Started));
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Scanning,
        }));

        let scanner = WalkDirScanner::new(self.config.scan_config.clone())
            .with_cancellation(self.cancel.clone());
        let scanned = match scanner.scan_with_events(&sources, events) {
            Ok(scanned) => scanned,
            Err(ScanError::Cancelled) => {
                events.send(Event::Pipeline(PipelineEvent::Cancelled));
                return Ok(OrganizeResult {
                    dry_run: self.config.dry_run,
                    cancelled: true,
                    ..Default::default()
                });
            }
            Err(e) => return Err(e.into()),
        };

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Reading,
        }));
        let mut loader = MediaLoader::new(Arc::clone(&self.extractor));
        if let Some(cache) = &self.cache {
            loader = loader.with_cache(Arc::clone(cache));
        }
        let loaded = loader.load(&scanned.files, events, &self.cancel);

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Analyzing,
        }));
        let (plan, plan_errors) =
            OrganizePlanner::new(&self.config, self.fs.as_ref()).plan(&loaded.files);

        tracing::info!(
            "Planned {} file(s) into {} ({} undated, {} renamed on conflict)",
            plan.total_files,
            self.config.target.display(),
            plan.no_date_count,
            plan.conflict_count
        );

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Executing,
        }));
        let mut result = OrganizeExecutor::new(
            self.fs.as_ref(),
            self.config.operation,
            self.config.dry_run,
        )
        .execute(plan, events, &self.cancel);

        let mut errors = loaded.errors;
        errors.extend(plan_errors);
        errors.append(&mut result.errors);
        result.errors = errors;
        result.scan_errors = scanned.errors;
        result.cancelled = self.cancel.is_cancelled();
        result.duration_ms = start.elapsed().as_millis() as u64;

        if result.cancelled {
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::media::MediaKind;
    use crate::core::metadata::{MetaAttribute, MetadataMap};
    use crate::error::MetadataError;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct NameDate;

    impl MetadataExtractor for NameDate {
        fn extract(&self, path: &Path, _kind: MediaKind) -> std::result::Result<MetadataMap, MetadataError> {
            let stem = path.file_stem().unwrap().to_string_lossy();
            if stem.starts_with("undated") {
                return Ok(MetadataMap::default());
            }
            Ok(MetadataMap::from_pairs([(
                MetaAttribute::CreatedAt,
                "2023:07:04 09:30:00",
            )]))
        }
    }

    #[test]
    fn organizes_by_year_and_month() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(src.path().join("beach.jpg"), b"a").unwrap();
        fs::write(src.path().join("undated.mov"), b"b").unwrap();

        let result = Organizer::new(OrganizeConfig {
            sources: vec![src.path().to_path_buf()],
            target: dest.path().to_path_buf(),
            ..Default::default()
        })
        .with_extractor(Arc::new(NameDate))
        .run()
        .unwrap();

        assert_eq!(result.files_processed, 2);
        assert!(dest.path().join("2023/07/beach.jpg").exists());
        assert!(dest.path().join("unsorted/undated.mov").exists());
        assert!(src.path().join("beach.jpg").exists());
    }

    #[test]
    fn missing_source_is_a_config_error() {
        let dest = TempDir::new().unwrap();
        let result = Organizer::new(OrganizeConfig {
            sources: vec!["/definitely/not/here".into()],
            target: dest.path().to_path_buf(),
            ..Default::default()
        })
        .with_extractor(Arc::new(NameDate))
        .run();

        assert!(matches!(result, Err(OrganizerError::Config(_))));
    }

    #[test]
    fn bad_fallback_is_rejected() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let result = Organizer::new(OrganizeConfig {
            sources: vec![src.path().to_path_buf()],
            target: dest.path().to_path_buf(),
            fallback: "a/b".into(),
            ..Default::default()
        })
        .run();

        assert!(matches!(result, Err(OrganizerError::Config(_))));
    }
}
