//! # Media Module
//!
//! The file records every other stage works on.
//!
//! - [`MediaKind`] tells images from videos and owns the extension tables.
//! - [`DiscoveredFile`] is what the scanner finds on disk.
//! - [`MediaFile`] is a discovered file plus its metadata. It never changes after
//!   construction; its identity hash is computed lazily, at most once.

use crate::core::metadata::MetadataMap;
use crate::core::naming::Hash;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "heic", "heif", "gif", "bmp", "tiff", "tif",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "m4v", "avi", "mkv", "wmv", "webm", "3gp", "mts",
];

/// Whether a file is a still image or a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a bare extension (without the dot), case-insensitively
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Classify a path by its extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Tag used as the first segment of a hash name
    pub fn prefix(&self) -> &'static str {
        match self {
            MediaKind::Image => "i",
            MediaKind::Video => "v",
        }
    }

    /// Inverse of [`MediaKind::prefix`]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "i" => Some(MediaKind::Image),
            "v" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_EXTENSIONS,
            MediaKind::Video => VIDEO_EXTENSIONS,
        }
    }

    /// Check that an extension belongs to this kind
    pub fn accepts_extension(&self, ext: &str) -> bool {
        Self::from_extension(ext) == Some(*self)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Extension written on renamed files: lowercase, with spelling variants folded
pub fn canonical_extension(ext: &str) -> String {
    match ext.to_lowercase().as_str() {
        "jpg" => "jpeg".to_string(),
        "tif" => "tiff".to_string(),
        other => other.to_string(),
    }
}

/// A media file found on disk, before its metadata is read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub kind: MediaKind,
    /// File size in bytes
    pub size: u64,
    /// Last modified time
    pub modified: SystemTime,
}

/// A media file with its metadata
#[derive(Debug, Clone)]
pub struct MediaFile {
    kind: MediaKind,
    path: PathBuf,
    original_name: String,
    metadata: MetadataMap,
    cached_hash: OnceLock<Hash>,
}

impl MediaFile {
    pub fn new(kind: MediaKind, path: PathBuf, metadata: MetadataMap) -> Self {
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            kind,
            path,
            original_name,
            metadata,
            cached_hash: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name at discovery time
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    /// Extension of the current path, without the dot
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    /// Identity hash, computed on first use.
    ///
    /// `None` when the metadata holds no date, model or full GPS position:
    /// such files have no identity and would all collide on one name.
    pub fn hash(&self) -> Option<&Hash> {
        if !self.metadata.has_identity() {
            return None;
        }
        Some(
            self.cached_hash
                .get_or_init(|| Hash::compute(self.kind, &self.metadata)),
        )
    }

    /// The same file at a different location.
    ///
    /// Metadata, original name and any computed hash carry over.
    pub fn relocated(&self, path: PathBuf) -> Self {
        Self {
            kind: self.kind,
            path,
            original_name: self.original_name.clone(),
            metadata: self.metadata.clone(),
            cached_hash: self.cached_hash.clone(),
        }
    }
}

impl PartialEq for MediaFile {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.path == other.path && self.metadata == other.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::MetaAttribute;

    #[test]
    fn kind_from_extension_is_case_insensitive() {
        assert_eq!(MediaKind::from_extension("JPG"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_extension("heic"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_extension("MOV"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_extension("pdf"), None);
    }

    #[test]
    fn prefix_round_trips() {
        for kind in [MediaKind::Image, MediaKind::Video] {
            assert_eq!(MediaKind::from_prefix(kind.prefix()), Some(kind));
        }
        assert_eq!(MediaKind::from_prefix("x"), None);
    }

    #[test]
    fn canonical_extension_folds_variants() {
        assert_eq!(canonical_extension("JPG"), "jpeg");
        assert_eq!(canonical_extension("jpeg"), "jpeg");
        assert_eq!(canonical_extension("TIF"), "tiff");
        assert_eq!(canonical_extension("MOV"), "mov");
    }

    #[test]
    fn media_file_keeps_original_name() {
        let file = MediaFile::new(
            MediaKind::Image,
            PathBuf::from("/photos/IMG_0001.JPG"),
            MetadataMap::default(),
        );
        assert_eq!(file.original_name(), "IMG_0001.JPG");
        assert_eq!(file.extension(), Some("JPG"));
    }

    #[test]
    fn hash_is_none_without_metadata() {
        let file = MediaFile::new(
            MediaKind::Image,
            PathBuf::from("/photos/a.jpg"),
            MetadataMap::default(),
        );
        assert!(file.hash().is_none());
    }

    #[test]
    fn hash_is_memoized_and_survives_relocation() {
        let metadata = MetadataMap::from_pairs([(MetaAttribute::Model, "Canon")]);
        let file = MediaFile::new(MediaKind::Image, PathBuf::from("/photos/a.jpg"), metadata);

        let first = file.hash().unwrap().clone();
        let second = file.hash().unwrap();
        assert_eq!(&first, second);

        let moved = file.relocated(PathBuf::from("/photos/b.jpg"));
        assert_eq!(moved.hash(), Some(&first));
        assert_eq!(moved.original_name(), "a.jpg");
    }
}
