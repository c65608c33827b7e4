//! Turning media files into rename candidates.

use super::FileName;
use crate::core::media::{canonical_extension, MediaFile};
use crate::error::FileError;

/// A file and the file it would become after renaming
#[derive(Debug, Clone, PartialEq)]
pub struct RenameFile {
    pub original: MediaFile,
    pub renamed: MediaFile,
}

impl RenameFile {
    /// Whether the rename would leave the path as it is
    pub fn is_unchanged(&self) -> bool {
        self.original.path() == self.renamed.path()
    }
}

/// Computes hash names for media files
#[derive(Debug, Clone, Copy, Default)]
pub struct HashEngine {
    /// Recompute names that already look like hashes
    pub rehash: bool,
}

impl HashEngine {
    pub fn new(rehash: bool) -> Self {
        Self { rehash }
    }

    /// Propose a hash name for `file`.
    ///
    /// Returns `None` for files that are already hashed (unless rehashing)
    /// and `NoMetadata` for files with nothing to derive a name from.
    pub fn convert_to_hash(&self, file: &MediaFile) -> Option<Result<RenameFile, FileError>> {
        if !self.rehash && FileName::from_path(file.path()).is_hashed() {
            return None;
        }

        let Some(hash) = file.hash() else {
            return Some(Err(FileError::NoMetadata {
                path: file.path().to_path_buf(),
            }));
        };

        let extension = canonical_extension(file.extension().unwrap_or_default());
        let target = file.path().with_file_name(hash.file_name(&extension));

        Some(Ok(RenameFile {
            original: file.clone(),
            renamed: file.relocated(target),
        }))
    }
}
