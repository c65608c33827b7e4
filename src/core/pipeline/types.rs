//! Types shared by the rename pipeline stages.

use crate::error::{FileError, ScanError};
use crate::events::PipelineSummary;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative cancellation flag.
///
/// Cloning shares the flag. Work already in progress is never interrupted;
/// stages check the flag before starting each file.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel from a background thread once `timeout` has passed
    pub fn cancel_after(&self, timeout: Duration) {
        let token = self.clone();
        std::thread::spawn(move || {
            std::thread::sleep(timeout);
            if !token.is_cancelled() {
                tracing::warn!("Timeout of {}s reached, cancelling", timeout.as_secs());
                token.cancel();
            }
        });
    }
}

/// Final action for a file that went through resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedAction {
    Rename,
    Remove,
    Move,
    /// Already carries the right name in the right place
    KeepUnchanged,
}

/// Where a file ended up in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Discovered,
    /// Already hashed, or already sorted into its hash folder
    Skipped,
    /// No metadata to derive a name from
    NoMetadataWarning,
    PreparedRename,
    Resolved(ResolvedAction),
    Failed,
    Cancelled,
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub source: PathBuf,
    /// `None` for removals and files that stay put
    pub target: Option<PathBuf>,
    pub state: FileState,
    /// For removals: the file that was kept instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<PathBuf>,
}

impl PlanEntry {
    pub fn new(source: PathBuf, target: Option<PathBuf>, state: FileState) -> Self {
        Self {
            source,
            target,
            state,
            duplicate_of: None,
        }
    }
}

/// Per-state tallies of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    pub renamed: usize,
    pub removed: usize,
    pub moved: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub no_metadata: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl ReportCounts {
    pub fn from_entries(entries: &[PlanEntry]) -> Self {
        let mut counts = Self::default();
        for entry in entries {
            match entry.state {
                FileState::Resolved(ResolvedAction::Rename) => counts.renamed += 1,
                FileState::Resolved(ResolvedAction::Remove) => counts.removed += 1,
                FileState::Resolved(ResolvedAction::Move) => counts.moved += 1,
                FileState::Resolved(ResolvedAction::KeepUnchanged) => counts.unchanged += 1,
                FileState::Skipped => counts.skipped += 1,
                FileState::NoMetadataWarning => counts.no_metadata += 1,
                FileState::Failed => counts.failed += 1,
                FileState::Cancelled => counts.cancelled += 1,
                FileState::Discovered | FileState::PreparedRename => {}
            }
        }
        counts
    }
}

/// Outcome of a rename run
#[derive(Debug, Default)]
pub struct RenameReport {
    pub entries: Vec<PlanEntry>,
    pub counts: ReportCounts,
    /// Every per-file failure, from any stage
    pub errors: Vec<FileError>,
    /// Directories or entries the walk could not read
    pub scan_errors: Vec<ScanError>,
    /// Images without metadata, candidates for similarity grouping
    pub no_metadata_images: Vec<PathBuf>,
    /// Files that could not be named; reported, but not failures
    pub warnings: Vec<FileError>,
    pub total_files: usize,
    pub dry_run: bool,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl RenameReport {
    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty() || !self.scan_errors.is_empty()
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            total_files: self.total_files,
            renamed: self.counts.renamed,
            removed: self.counts.removed,
            moved: self.counts.moved,
            skipped: self.counts.skipped + self.counts.unchanged + self.counts.no_metadata,
            failed: self.errors.len() + self.scan_errors.len(),
            duration_ms: self.duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn cancel_after_fires() {
        let token = CancellationToken::new();
        token.cancel_after(Duration::from_millis(10));
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !token.is_cancelled() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(token.is_cancelled());
    }

    #[test]
    fn counts_follow_states() {
        let entries = vec![
            PlanEntry::new("/a".into(), Some("/b".into()), FileState::Resolved(ResolvedAction::Rename)),
            PlanEntry::new("/c".into(), None, FileState::Resolved(ResolvedAction::Remove)),
            PlanEntry::new("/d".into(), None, FileState::NoMetadataWarning),
            PlanEntry::new("/e".into(), None, FileState::Failed),
        ];
        let counts = ReportCounts::from_entries(&entries);
        assert_eq!(counts.renamed, 1);
        assert_eq!(counts.removed, 1);
        assert_eq!(counts.no_metadata, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.moved, 0);
    }

    #[test]
    fn entry_serializes_state_in_snake_case() {
        let entry = PlanEntry::new(
            "/a.jpg".into(),
            None,
            FileState::Resolved(ResolvedAction::KeepUnchanged),
        );
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("keep_unchanged"));
        assert!(!json.contains("duplicate_of"));
    }
}
