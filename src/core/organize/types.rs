//! Types for the organize module.

use crate::core::scanner::ScanConfig;
use crate::error::{FileError, ScanError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Folder used for files without a capture date
pub const DEFAULT_FALLBACK: &str = "unsorted";

/// Operation mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Copy files to destination (keep originals)
    #[default]
    Copy,
    /// Move files to destination
    Move,
}

/// Configuration for organize operation
#[derive(Debug, Clone)]
pub struct OrganizeConfig {
    pub sources: Vec<PathBuf>,
    /// Root of the `<yyyy>/<MM>` layout
    pub target: PathBuf,
    pub operation: OperationMode,
    /// Overwrite files already present in the target instead of renaming
    pub force: bool,
    pub dry_run: bool,
    /// Subdirectory of `target` for undated files
    pub fallback: String,
    pub scan_config: ScanConfig,
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            target: PathBuf::new(),
            operation: OperationMode::Copy,
            force: false,
            dry_run: false,
            fallback: DEFAULT_FALLBACK.to_string(),
            scan_config: ScanConfig::default(),
        }
    }
}

/// Information about a file to be organized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub date: Option<NaiveDate>,
    pub size_bytes: u64,
    /// The original name was taken and a `_N` suffix was added
    pub has_conflict: bool,
}

/// Summary of files by year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YearSummary {
    pub year: i32,
    pub count: usize,
    pub size_bytes: u64,
}

/// The organization plan (preview)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizePlan {
    pub files: Vec<PlannedFile>,
    pub total_files: usize,
    pub total_size_bytes: u64,
    /// (earliest, latest)
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Newest year first
    pub by_year: Vec<YearSummary>,
    pub no_date_count: usize,
    pub conflict_count: usize,
    /// Sources that already sit at their destination
    pub in_place: usize,
}

/// Result of executing the plan
#[derive(Debug, Default)]
pub struct OrganizeResult {
    pub plan: OrganizePlan,
    pub files_processed: usize,
    pub folders_created: usize,
    pub total_size_bytes: u64,
    pub duration_ms: u64,
    pub dry_run: bool,
    pub cancelled: bool,
    pub errors: Vec<FileError>,
    pub scan_errors: Vec<ScanError>,
}

impl OrganizeResult {
    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty() || !self.scan_errors.is_empty()
    }
}
