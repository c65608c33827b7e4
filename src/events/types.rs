//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the organizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Discovery of media files
    Scan(ScanEvent),
    /// Metadata loading (extractors and cache)
    Metadata(MetadataEvent),
    /// Applying renames, moves and removals
    Execute(ExecuteEvent),
    /// Perceptual comparison of images
    Compare(CompareEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the scanning phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { paths: Vec<PathBuf> },
    /// Progress update during scanning
    Progress(ScanProgress),
    /// An error occurred but scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning completed
    Completed { total_files: usize },
}

/// Progress information during scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Number of directories scanned so far
    pub directories_scanned: usize,
    /// Number of media files found so far
    pub files_found: usize,
    /// Current directory being scanned
    pub current_path: PathBuf,
}

/// Events while metadata is read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MetadataEvent {
    Started { total_files: usize },
    Progress(MetadataProgress),
    /// The extractor found nothing usable; the file continues without metadata
    Unavailable { path: PathBuf },
    Error { path: PathBuf, message: String },
    Completed { total_loaded: usize, cache_hits: usize },
}

/// Progress information while metadata is read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataProgress {
    pub completed: usize,
    pub total: usize,
    pub current_path: PathBuf,
    pub cache_hits: usize,
}

/// Events while a plan is applied to the filesystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecuteEvent {
    Started { total_actions: usize, dry_run: bool },
    /// One action finished (or would have, in a dry run)
    Applied {
        completed: usize,
        total: usize,
        source: PathBuf,
        target: Option<PathBuf>,
    },
    Failed { path: PathBuf, message: String },
    Completed { succeeded: usize, failed: usize },
}

/// Events during perceptual comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CompareEvent {
    Started { total_images: usize, total_comparisons: usize },
    /// An image thumbnail was hashed
    Hashed { completed: usize, total: usize },
    Completed { similar_pairs: usize },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed
    Completed { summary: PipelineSummary },
    /// Pipeline was cancelled; already applied operations persist
    Cancelled,
}

/// Phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Reading,
    Preparing,
    Analyzing,
    Executing,
    Comparing,
}

/// Summary of a rename run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub total_files: usize,
    pub renamed: usize,
    pub removed: usize,
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Reading => write!(f, "Reading metadata"),
            PipelinePhase::Preparing => write!(f, "Preparing"),
            PipelinePhase::Analyzing => write!(f, "Analyzing"),
            PipelinePhase::Executing => write!(f, "Executing"),
            PipelinePhase::Comparing => write!(f, "Comparing"),
        }
    }
}
