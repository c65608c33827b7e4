//! End-to-end rename run: scan, read, prepare, analyze, execute.

use super::executor::PlanExecutor;
use super::planner::RenamePlanner;
use super::types::{CancellationToken, FileState, PlanEntry, RenameReport, ReportCounts};
use crate::core::cache::CacheBackend;
use crate::core::fs::{FileSystem, LocalFileSystem};
use crate::core::loader::MediaLoader;
use crate::core::metadata::{MediaMetadataExtractor, MetadataExtractor};
use crate::core::naming::HashEngine;
use crate::core::scanner::{MediaScanner, ScanConfig, WalkDirScanner};
use crate::error::{OrganizerError, Result, ScanError};
use crate::events::{null_sender, Event, EventSender, PipelineEvent, PipelinePhase};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Check that every root is an existing directory and make it absolute.
///
/// Runs before any file is touched so a typo never starts a partial run.
pub fn validate_roots(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if paths.is_empty() {
        return Err(OrganizerError::Config("no paths given".to_string()));
    }
    paths
        .iter()
        .map(|path| {
            if !path.is_dir() {
                return Err(OrganizerError::Config(format!(
                    "{} is not a directory",
                    path.display()
                )));
            }
            path.canonicalize().map_err(|e| {
                OrganizerError::Config(format!("cannot resolve {}: {}", path.display(), e))
            })
        })
        .collect()
}

/// Configuration for a rename run
#[derive(Debug, Clone)]
pub struct RenameConfig {
    pub paths: Vec<PathBuf>,
    /// Recompute names of files that already carry a hashed name
    pub rehash: bool,
    pub force: bool,
    pub dry_run: bool,
    /// Move targets into the `<yyyy>/<MM>` folder matching the capture date
    pub path_correction: bool,
    pub scan_config: ScanConfig,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            rehash: false,
            force: false,
            dry_run: false,
            path_correction: true,
            scan_config: ScanConfig::default(),
        }
    }
}

/// Builder for [`RenamePipeline`]
pub struct RenamePipelineBuilder {
    config: RenameConfig,
    extractor: Option<Arc<dyn MetadataExtractor>>,
    cache: Option<Arc<dyn CacheBackend>>,
    fs: Option<Arc<dyn FileSystem>>,
    cancel: CancellationToken,
}

impl RenamePipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: RenameConfig::default(),
            extractor: None,
            cache: None,
            fs: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Directories to process
    pub fn paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config.paths = paths;
        self
    }

    pub fn rehash(mut self, rehash: bool) -> Self {
        self.config.rehash = rehash;
        self
    }

    /// Overwrite existing targets
    pub fn force(mut self, force: bool) -> Self {
        self.config.force = force;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    pub fn path_correction(mut self, enabled: bool) -> Self {
        self.config.path_correction = enabled;
        self
    }

    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.config.scan_config = config;
        self
    }

    /// Metadata source; defaults to EXIF plus ffprobe when installed
    pub fn extractor(mut self, extractor: Arc<dyn MetadataExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn build(self) -> RenamePipeline {
        RenamePipeline {
            config: self.config,
            extractor: self
                .extractor
                .unwrap_or_else(|| Arc::new(MediaMetadataExtractor::detect())),
            cache: self.cache,
            fs: self.fs.unwrap_or_else(|| Arc::new(LocalFileSystem)),
            cancel: self.cancel,
        }
    }
}

impl Default for RenamePipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Renames, deduplicates and relocates media by metadata hash
pub struct RenamePipeline {
    config: RenameConfig,
    extractor: Arc<dyn MetadataExtractor>,
    cache: Option<Arc<dyn CacheBackend>>,
    fs: Arc<dyn FileSystem>,
    cancel: CancellationToken,
}

impl RenamePipeline {
    pub fn builder() -> RenamePipelineBuilder {
        RenamePipelineBuilder::new()
    }

    pub fn config(&self) -> &RenameConfig {
        &self.config
    }

    pub fn run(&self) -> Result<RenameReport> {
        self.run_with_events(&null_sender())
    }

    pub fn run_with_events(&self, events: &EventSender) -> Result<RenameReport> {
        let roots = validate_roots(&self.config.paths)?;
        let start = Instant::now();

        let mut report = RenameReport {
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        events.send(Event::Pipeline(PipelineEvent::Started));

        // Scan
        phase(events, PipelinePhase::Scanning);
        let scanner = WalkDirScanner::new(self.config.scan_config.clone())
            .with_cancellation(self.cancel.clone());
        let scanned = match scanner.scan_with_events(&roots, events) {
            Ok(scanned) => scanned,
            Err(ScanError::Cancelled) => return Ok(self.finish(report, start, events)),
            Err(e) => return Err(e.into()),
        };
        report.total_files = scanned.files.len();
        report.scan_errors = scanned.errors;

        // Read metadata
        phase(events, PipelinePhase::Reading);
        let mut loader = MediaLoader::new(Arc::clone(&self.extractor));
        if let Some(cache) = &self.cache {
            loader = loader.with_cache(Arc::clone(cache));
        }
        let loaded = loader.load(&scanned.files, events, &self.cancel);
        for error in &loaded.errors {
            report
                .entries
                .push(PlanEntry::new(error.path().clone(), None, FileState::Failed));
        }
        report.errors.extend(loaded.errors);
        let cancelled_reads = loaded.cancelled;

        // Prepare
        phase(events, PipelinePhase::Preparing);
        let planner = RenamePlanner::new(
            HashEngine::new(self.config.rehash),
            self.config.path_correction,
            self.fs.as_ref(),
        );
        let prepared = planner.prepare(&loaded.files, &self.cancel);
        report.entries.extend(prepared.entries);
        report.no_metadata_images = prepared.no_metadata_images;
        report.warnings = prepared.warnings;

        if self.cancel.is_cancelled() {
            report.entries.extend(prepared.candidates.iter().map(|c| {
                PlanEntry::new(c.original.path().to_path_buf(), None, FileState::Cancelled)
            }));
            report.entries.extend(
                prepared
                    .settled
                    .iter()
                    .map(|f| PlanEntry::new(f.path().to_path_buf(), None, FileState::Skipped)),
            );
            report.counts = ReportCounts::from_entries(&report.entries);
            report.counts.cancelled += cancelled_reads;
            return Ok(self.finish(report, start, events));
        }

        // Analyze
        phase(events, PipelinePhase::Analyzing);
        let plan = planner.analyze(prepared.candidates, prepared.settled);
        for error in &plan.errors {
            report
                .entries
                .push(PlanEntry::new(error.path().clone(), None, FileState::Failed));
        }
        report.errors.extend(plan.errors);
        report.entries.extend(plan.unchanged);

        tracing::info!(
            "Planned {} action(s) for {} file(s)",
            plan.actions.len(),
            report.total_files
        );

        // Execute
        phase(events, PipelinePhase::Executing);
        let execution = PlanExecutor::new(self.fs.as_ref())
            .dry_run(self.config.dry_run)
            .force(self.config.force)
            .execute(&plan.actions, events, &self.cancel);
        report.entries.extend(execution.entries);
        report.errors.extend(execution.errors);

        report.counts = ReportCounts::from_entries(&report.entries);
        report.counts.cancelled += cancelled_reads;

        Ok(self.finish(report, start, events))
    }

    fn finish(&self, mut report: RenameReport, start: Instant, events: &EventSender) -> RenameReport {
        report.cancelled = self.cancel.is_cancelled();
        report.duration_ms = start.elapsed().as_millis() as u64;

        if report.cancelled {
            tracing::warn!("Run cancelled; completed operations are kept");
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
        }
        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: report.summary(),
        }));

        report
    }
}

fn phase(events: &EventSender, phase: PipelinePhase) {
    events.send(Event::Pipeline(PipelineEvent::PhaseChanged { phase }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::media::MediaKind;
    use crate::core::metadata::{MetaAttribute, MetadataMap};
    use crate::error::MetadataError;
    use crate::events::EventChannel;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Every `.jpg` carries the same metadata; `.png` has none
    struct FixedExtractor;

    impl MetadataExtractor for FixedExtractor {
        fn extract(&self, path: &Path, _kind: MediaKind) -> std::result::Result<MetadataMap, MetadataError> {
            if path.extension().is_some_and(|e| e == "png") {
                return Ok(MetadataMap::default());
            }
            Ok(MetadataMap::from_pairs([
                (MetaAttribute::CreatedAt, "2022:04:01 14:16:48"),
                (MetaAttribute::Model, "Canon"),
            ]))
        }
    }

    fn pipeline(root: &Path) -> RenamePipelineBuilder {
        RenamePipeline::builder()
            .paths(vec![root.to_path_buf()])
            .extractor(Arc::new(FixedExtractor))
    }

    #[test]
    fn missing_root_is_a_config_error() {
        let result = RenamePipeline::builder()
            .paths(vec![PathBuf::from("/definitely/not/here")])
            .extractor(Arc::new(FixedExtractor))
            .build()
            .run();
        assert!(matches!(result, Err(OrganizerError::Config(_))));

        let result = RenamePipeline::builder().build().run();
        assert!(matches!(result, Err(OrganizerError::Config(_))));
    }

    #[test]
    fn equal_copies_collapse_to_one_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.jpg"), b"same").unwrap();
        fs::write(temp.path().join("b.jpg"), b"same").unwrap();
        fs::write(temp.path().join("scan.png"), b"pixels").unwrap();

        let report = pipeline(temp.path()).build().run().unwrap();

        assert_eq!(report.total_files, 3);
        assert_eq!(report.counts.renamed, 1);
        assert_eq!(report.counts.removed, 1);
        assert_eq!(report.counts.no_metadata, 1);
        assert!(!report.has_failures());
        assert_eq!(report.no_metadata_images.len(), 1);
        assert_eq!(report.warnings.len(), 1);

        let remaining: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().any(|n| n.starts_with("i_20220401T141648_")));
    }

    #[test]
    fn second_run_changes_nothing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.jpg"), b"same").unwrap();

        pipeline(temp.path()).build().run().unwrap();
        let report = pipeline(temp.path()).build().run().unwrap();

        assert_eq!(report.counts.renamed, 0);
        assert_eq!(report.counts.skipped, 1);
    }

    #[test]
    fn dry_run_reports_without_touching() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.jpg");
        fs::write(&file, b"same").unwrap();

        let report = pipeline(temp.path()).dry_run(true).build().run().unwrap();

        assert!(report.dry_run);
        assert_eq!(report.counts.renamed, 1);
        assert!(file.exists());
    }

    #[test]
    fn cancelled_run_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.jpg");
        fs::write(&file, b"same").unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let report = pipeline(temp.path())
            .cancellation(token)
            .build()
            .run()
            .unwrap();

        assert!(report.cancelled);
        assert!(file.exists());
    }

    #[test]
    fn phases_are_announced_in_order() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.jpg"), b"same").unwrap();

        let (sender, receiver) = EventChannel::new();
        pipeline(temp.path()).build().run_with_events(&sender).unwrap();
        drop(sender);

        let phases: Vec<PipelinePhase> = receiver
            .iter()
            .filter_map(|event| match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => Some(phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                PipelinePhase::Scanning,
                PipelinePhase::Reading,
                PipelinePhase::Preparing,
                PipelinePhase::Analyzing,
                PipelinePhase::Executing,
            ]
        );
    }
}
