//! File filtering logic for the scanner.

use crate::core::media::MediaKind;
use std::collections::HashSet;
use std::path::Path;

/// Decides which files are media the organizer handles
pub struct MediaFilter {
    kinds: HashSet<MediaKind>,
    include_hidden: bool,
}

impl MediaFilter {
    /// Accept images and videos, skip hidden files
    pub fn new() -> Self {
        Self {
            kinds: [MediaKind::Image, MediaKind::Video].into_iter().collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Restrict to the given kinds
    pub fn with_kinds(mut self, kinds: &[MediaKind]) -> Self {
        self.kinds = kinds.iter().copied().collect();
        self
    }

    pub fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with('.'))
    }

    /// Kind of the file if it should be included
    pub fn classify(&self, path: &Path) -> Option<MediaKind> {
        if !self.include_hidden && Self::is_hidden(path) {
            return None;
        }
        MediaKind::from_path(path).filter(|kind| self.kinds.contains(kind))
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new()
    }
}
