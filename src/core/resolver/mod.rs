//! # Resolver Module
//!
//! Decides what happens to rename candidates that collide on the same name.
//!
//! Candidates are grouped by target path. Inside a group, file size is the
//! tie breaker:
//! - a lone candidate is renamed;
//! - equal sizes mean true duplicates: the first is renamed, the rest removed;
//! - differing sizes mean distinct files that share metadata: all of them are
//!   moved into a `<hash>/` folder next to the target, keeping their names.

use crate::core::fs::{unique_path, FileSystem};
use crate::core::media::MediaFile;
use crate::core::naming::{Hash, RenameFile};
use crate::error::FileError;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A file to delete because an identical one is kept
#[derive(Debug, Clone, PartialEq)]
pub struct FileToRemove {
    pub file: MediaFile,
    /// Original of the kept file
    pub duplicate_of: MediaFile,
}

/// A file to move into its hash folder
#[derive(Debug, Clone, PartialEq)]
pub struct FileToMove {
    pub hash: Hash,
    pub file: MediaFile,
    pub target: PathBuf,
}

/// What to do with one file
#[derive(Debug, Clone, PartialEq)]
pub enum FileAction {
    Rename(RenameFile),
    Remove(FileToRemove),
    Move(FileToMove),
}

impl FileAction {
    /// Current location of the file the action applies to
    pub fn source(&self) -> &Path {
        match self {
            FileAction::Rename(r) => r.original.path(),
            FileAction::Remove(r) => r.file.path(),
            FileAction::Move(m) => m.file.path(),
        }
    }

    /// Where the file ends up; `None` when it is deleted
    pub fn target(&self) -> Option<&Path> {
        match self {
            FileAction::Rename(r) => Some(r.renamed.path()),
            FileAction::Remove(_) => None,
            FileAction::Move(m) => Some(&m.target),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            FileAction::Rename(_) => ActionKind::Rename,
            FileAction::Remove(_) => ActionKind::Remove,
            FileAction::Move(_) => ActionKind::Move,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Rename,
    Remove,
    Move,
}

/// Actions for every candidate that could be classified, plus the failures
#[derive(Debug, Default)]
pub struct Resolution {
    pub actions: Vec<FileAction>,
    pub errors: Vec<FileError>,
}

impl Resolution {
    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind() == kind).count()
    }
}

/// Classifies colliding rename candidates
pub struct DuplicateResolver<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> DuplicateResolver<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    pub fn resolve(&self, candidates: Vec<RenameFile>) -> Resolution {
        let mut resolution = Resolution::default();

        // Group by target path, keeping first-seen order
        let mut order: Vec<PathBuf> = Vec::new();
        let mut groups: HashMap<PathBuf, Vec<(RenameFile, u64)>> = HashMap::new();

        for candidate in candidates {
            let size = match self.fs.file_size(candidate.original.path()) {
                Ok(size) => size,
                Err(e) => {
                    resolution.errors.push(FileError::runtime(
                        candidate.original.path(),
                        "read size of",
                        e,
                    ));
                    continue;
                }
            };

            let key = candidate.renamed.path().to_path_buf();
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push((candidate, size));
        }

        let mut reserved: HashSet<PathBuf> = HashSet::new();

        for key in order {
            let Some(group) = groups.remove(&key) else {
                continue;
            };
            self.classify(group, &mut reserved, &mut resolution);
        }

        tracing::debug!(
            "Resolved {} actions ({} renames, {} removals, {} moves), {} errors",
            resolution.actions.len(),
            resolution.count(ActionKind::Rename),
            resolution.count(ActionKind::Remove),
            resolution.count(ActionKind::Move),
            resolution.errors.len()
        );

        resolution
    }

    fn classify(
        &self,
        group: Vec<(RenameFile, u64)>,
        reserved: &mut HashSet<PathBuf>,
        resolution: &mut Resolution,
    ) {
        let distinct_sizes: HashSet<u64> = group.iter().map(|(_, size)| *size).collect();

        if group.len() == 1 || distinct_sizes.len() == 1 {
            let mut members = group.into_iter().map(|(candidate, _)| candidate);
            let Some(kept) = members.next() else {
                return;
            };
            let kept_original = kept.original.clone();
            resolution.actions.push(FileAction::Rename(kept));
            for duplicate in members {
                resolution.actions.push(FileAction::Remove(FileToRemove {
                    file: duplicate.original,
                    duplicate_of: kept_original.clone(),
                }));
            }
            return;
        }

        for (candidate, _) in group {
            match self.move_target(&candidate, reserved) {
                Ok(action) => resolution.actions.push(FileAction::Move(action)),
                Err(e) => resolution.errors.push(e),
            }
        }
    }

    fn move_target(
        &self,
        candidate: &RenameFile,
        reserved: &mut HashSet<PathBuf>,
    ) -> Result<FileToMove, FileError> {
        let file = &candidate.original;
        let Some(hash) = candidate.renamed.hash().cloned() else {
            return Err(FileError::NoMetadata {
                path: file.path().to_path_buf(),
            });
        };

        let parent = candidate
            .renamed
            .path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let folder = parent.join(hash.as_str());

        let existing: HashSet<PathBuf> = self
            .fs
            .list_files(&folder)
            .map_err(|e| FileError::runtime(&folder, "list", e))?
            .into_iter()
            .filter(|p| p != file.path())
            .collect();

        let target = unique_path(&folder.join(file.original_name()), |p| {
            reserved.contains(p) || existing.contains(p)
        });
        reserved.insert(target.clone());

        Ok(FileToMove {
            hash,
            file: file.clone(),
            target,
        })
    }
}
