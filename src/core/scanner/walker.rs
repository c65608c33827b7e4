//! Directory walking implementation using walkdir.

use super::{filter::MediaFilter, MediaScanner, ScanResult};
use crate::core::media::{DiscoveredFile, MediaKind};
use crate::core::pipeline::CancellationToken;
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent, ScanProgress};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Kinds of media to report
    pub kinds: Vec<MediaKind>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: false,
            max_depth: None,
            kinds: vec![MediaKind::Image, MediaKind::Video],
        }
    }
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: MediaFilter,
    cancel: CancellationToken,
}

impl WalkDirScanner {
    pub fn new(config: ScanConfig) -> Self {
        let filter = MediaFilter::new()
            .with_hidden(config.include_hidden)
            .with_kinds(&config.kinds);

        Self {
            config,
            filter,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop walking once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn scan_directory(
        &self,
        root: &Path,
        events: &EventSender,
        result: &mut ScanResult,
    ) -> Result<(), ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        let include_hidden = self.config.include_hidden;
        let entries = walker.into_iter().filter_entry(|entry| {
            include_hidden || entry.depth() == 0 || !MediaFilter::is_hidden(entry.path())
        });

        let mut directories_scanned = 0;

        for entry in entries {
            if self.cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let error = if e.io_error().map(|io| io.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path: path.clone() }
                    } else {
                        ScanError::ReadDirectory {
                            path: path.clone(),
                            source: std::io::Error::other(e.to_string()),
                        }
                    };
                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));
                    result.errors.push(error);
                    continue;
                }
            };

            let path = entry.path();

            if entry.file_type().is_dir() {
                directories_scanned += 1;
                events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                    directories_scanned,
                    files_found: result.files.len(),
                    current_path: path.to_path_buf(),
                })));
                continue;
            }

            let Some(kind) = self.filter.classify(path) else {
                continue;
            };

            match fs::metadata(path) {
                Ok(metadata) if metadata.is_file() => result.files.push(DiscoveredFile {
                    path: path.to_path_buf(),
                    kind,
                    size: metadata.len(),
                    modified: metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
                }),
                Ok(_) => {}
                Err(e) => {
                    let error = ScanError::ReadDirectory {
                        path: path.to_path_buf(),
                        source: e,
                    };
                    events.send(Event::Scan(ScanEvent::Error {
                        path: path.to_path_buf(),
                        message: error.to_string(),
                    }));
                    result.errors.push(error);
                }
            }
        }

        Ok(())
    }
}

impl MediaScanner for WalkDirScanner {
    fn scan(&self, paths: &[PathBuf]) -> Result<ScanResult, ScanError> {
        self.scan_with_events(paths, &crate::events::null_sender())
    }

    fn scan_with_events(
        &self,
        paths: &[PathBuf],
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        events.send(Event::Scan(ScanEvent::Started {
            paths: paths.to_vec(),
        }));

        let mut result = ScanResult::default();

        for path in paths {
            match self.scan_directory(path, events, &mut result) {
                Ok(()) => {}
                Err(ScanError::Cancelled) => return Err(ScanError::Cancelled),
                Err(e) => result.errors.push(e),
            }
        }

        tracing::info!(
            "Found {} media files in {} location(s)",
            result.files.len(),
            paths.len()
        );

        events.send(Event::Scan(ScanEvent::Completed {
            total_files: result.files.len(),
        }));

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        path
    }

    #[test]
    fn scan_empty_directory_returns_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let result = WalkDirScanner::new(ScanConfig::default())
            .scan(&[temp_dir.path().to_path_buf()])
            .unwrap();

        assert!(result.files.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn scan_classifies_images_and_videos() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "photo.jpg");
        touch(temp_dir.path(), "clip.mov");
        touch(temp_dir.path(), "notes.txt");

        let result = WalkDirScanner::new(ScanConfig::default())
            .scan(&[temp_dir.path().to_path_buf()])
            .unwrap();

        assert_eq!(result.files.len(), 2);
        let kinds: Vec<_> = result.files.iter().map(|f| f.kind).collect();
        assert!(kinds.contains(&MediaKind::Image));
        assert!(kinds.contains(&MediaKind::Video));
        assert!(result.files.iter().all(|f| f.size == 4));
    }

    #[test]
    fn scan_traverses_nested_directories_in_name_order() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "b.jpg");
        touch(temp_dir.path(), "a/nested.jpg");

        let result = WalkDirScanner::new(ScanConfig::default())
            .scan(&[temp_dir.path().to_path_buf()])
            .unwrap();

        let names: Vec<_> = result
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["nested.jpg", "b.jpg"]);
    }

    #[test]
    fn scan_skips_hidden_files_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "visible.jpg");
        touch(temp_dir.path(), ".hidden.jpg");
        touch(temp_dir.path(), ".thumbnails/inside.jpg");

        let result = WalkDirScanner::new(ScanConfig::default())
            .scan(&[temp_dir.path().to_path_buf()])
            .unwrap();

        assert_eq!(result.files.len(), 1);
        assert!(result.files[0].path.ends_with("visible.jpg"));

        let config = ScanConfig {
            include_hidden: true,
            ..Default::default()
        };
        let result = WalkDirScanner::new(config)
            .scan(&[temp_dir.path().to_path_buf()])
            .unwrap();
        assert_eq!(result.files.len(), 3);
    }

    #[test]
    fn scan_can_be_limited_to_images() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "photo.png");
        touch(temp_dir.path(), "clip.mp4");

        let config = ScanConfig {
            kinds: vec![MediaKind::Image],
            ..Default::default()
        };
        let result = WalkDirScanner::new(config)
            .scan(&[temp_dir.path().to_path_buf()])
            .unwrap();

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].kind, MediaKind::Image);
    }

    #[test]
    fn scan_nonexistent_directory_records_error() {
        let result = WalkDirScanner::new(ScanConfig::default())
            .scan(&[PathBuf::from("/nonexistent/path/12345")])
            .unwrap();

        assert!(matches!(
            result.errors.as_slice(),
            [ScanError::DirectoryNotFound { .. }]
        ));
    }

    #[test]
    fn cancelled_scan_stops() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "photo.jpg");

        let token = CancellationToken::new();
        token.cancel();

        let result = WalkDirScanner::new(ScanConfig::default())
            .with_cancellation(token)
            .scan(&[temp_dir.path().to_path_buf()]);
        assert!(matches!(result, Err(ScanError::Cancelled)));
    }
}
