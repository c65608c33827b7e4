//! # Scanner Module
//!
//! Discovers photo and video files in directories.
//!
//! Images: jpg, jpeg, png, webp, heic, heif, gif, bmp, tiff, tif.
//! Videos: mp4, mov, m4v, avi, mkv, wmv, webm, 3gp, mts.
//!
//! ## Example
//! ```rust,ignore
//! use media_hash_organizer::core::scanner::{MediaScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! let found = scanner.scan(&["/Users/me/Pictures".into()])?;
//! ```

mod filter;
mod walker;

pub use filter::MediaFilter;
pub use walker::{ScanConfig, WalkDirScanner};

use crate::core::media::DiscoveredFile;
use crate::error::ScanError;
use crate::events::EventSender;
use std::path::PathBuf;

/// Result of a scan operation
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Media files found, in traversal order
    pub files: Vec<DiscoveredFile>,
    /// Errors that did not stop the scan
    pub errors: Vec<ScanError>,
}

/// Trait for media scanners.
///
/// Implement this to feed the pipeline from somewhere other than a directory
/// walk, e.g. a fixed list in tests.
pub trait MediaScanner: Send + Sync {
    fn scan(&self, paths: &[PathBuf]) -> Result<ScanResult, ScanError>;

    /// Scan with progress reporting via events
    fn scan_with_events(
        &self,
        paths: &[PathBuf],
        events: &EventSender,
    ) -> Result<ScanResult, ScanError>;
}
