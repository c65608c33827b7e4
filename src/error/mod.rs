//! # Error Module
//!
//! Error types for the media organizer.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-file failures are values** - collected into reports, never thrown past their stage
//! - **Recovery hints** - suggest how to fix when possible

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{failed} file operation(s) failed, see the list above")]
    PartialFailure { failed: usize },
}

/// A failure tied to a single file.
///
/// These never abort a batch. Stages collect them and hand them back to the
/// caller, which decides whether a non-empty list is fatal.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("No usable metadata in {path}")]
    NoMetadata { path: PathBuf },

    #[error("Failed to {operation} {path}: {source}")]
    Runtime {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read metadata of {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: MetadataError,
    },
}

impl FileError {
    /// Path of the file the failure belongs to
    pub fn path(&self) -> &PathBuf {
        match self {
            FileError::NoMetadata { path }
            | FileError::Runtime { path, .. }
            | FileError::Prepare { path, .. } => path,
        }
    }

    /// Shorthand for wrapping an I/O failure
    pub fn runtime(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        FileError::Runtime {
            path: path.into(),
            operation,
            source,
        }
    }
}

/// Errors that occur during media scanning
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan was cancelled")]
    Cancelled,
}

/// Errors raised by metadata extractors
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("No metadata could be extracted from {path}")]
    Unavailable { path: PathBuf },

    #[error("Cannot read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("{tool} failed on {path}: {reason}")]
    ToolFailed {
        tool: String,
        path: PathBuf,
        reason: String,
    },
}

/// Errors that occur while computing perceptual image hashes
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Failed to open image file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur with the hash cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to open cache database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Cache corruption detected at {path}. Delete this file and try again.")]
    Corrupted { path: PathBuf },

    #[error("Failed to serialize cached metadata: {0}")]
    SerializationFailed(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, OrganizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_metadata_error_includes_path() {
        let error = FileError::NoMetadata {
            path: PathBuf::from("/photos/scan.png"),
        };
        assert!(error.to_string().contains("/photos/scan.png"));
        assert_eq!(error.path(), &PathBuf::from("/photos/scan.png"));
    }

    #[test]
    fn runtime_error_names_operation() {
        let error = FileError::runtime(
            "/photos/a.jpg",
            "delete",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = error.to_string();
        assert!(message.contains("delete"));
        assert!(message.contains("/photos/a.jpg"));
    }

    #[test]
    fn prepare_error_wraps_metadata_error() {
        let error = FileError::Prepare {
            path: PathBuf::from("/videos/clip.mov"),
            source: MetadataError::ToolFailed {
                tool: "ffprobe".to_string(),
                path: PathBuf::from("/videos/clip.mov"),
                reason: "invalid json".to_string(),
            },
        };
        assert!(error.to_string().contains("ffprobe"));
    }

    #[test]
    fn cache_error_suggests_recovery() {
        let error = CacheError::Corrupted {
            path: PathBuf::from("/cache/metadata.db"),
        };
        assert!(error.to_string().contains("Delete this file"));
    }

    #[test]
    fn partial_failure_reports_count() {
        let error = OrganizerError::PartialFailure { failed: 3 };
        assert!(error.to_string().starts_with("3 file"));
    }
}
