//! Prepare and analyze stages of the rename pipeline.

use super::types::{CancellationToken, FileState, PlanEntry, ResolvedAction};
use crate::core::fs::FileSystem;
use crate::core::media::{MediaFile, MediaKind};
use crate::core::naming::{HashEngine, RenameFile};
use crate::core::resolver::{DuplicateResolver, FileAction};
use crate::error::FileError;
use chrono::Datelike;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Result of the prepare stage
#[derive(Debug, Default)]
pub struct Prepared {
    /// Rename candidates, sorted by original path
    pub candidates: Vec<RenameFile>,
    /// Files that need no further work or could not be named
    pub entries: Vec<PlanEntry>,
    /// Files already carrying a hash name. They stay put unless a candidate
    /// claims the same name.
    pub settled: Vec<MediaFile>,
    pub no_metadata_images: Vec<PathBuf>,
    /// Files nothing could be derived from
    pub warnings: Vec<FileError>,
}

/// Result of the analyze stage
#[derive(Debug, Default)]
pub struct Plan {
    pub actions: Vec<FileAction>,
    /// Files left where they are
    pub unchanged: Vec<PlanEntry>,
    pub errors: Vec<FileError>,
}

enum Prepare {
    Candidate(RenameFile),
    Settled(MediaFile),
    Skipped(PathBuf),
    NoMetadata(MediaFile, FileError),
    Cancelled(PathBuf),
}

/// Turns loaded files into a plan of actions
pub struct RenamePlanner<'a> {
    engine: HashEngine,
    path_correction: bool,
    fs: &'a dyn FileSystem,
}

impl<'a> RenamePlanner<'a> {
    pub fn new(engine: HashEngine, path_correction: bool, fs: &'a dyn FileSystem) -> Self {
        Self {
            engine,
            path_correction,
            fs,
        }
    }

    pub fn prepare(&self, files: &[MediaFile], cancel: &CancellationToken) -> Prepared {
        let outcomes: Vec<Prepare> = files
            .par_iter()
            .map(|file| {
                if cancel.is_cancelled() {
                    return Prepare::Cancelled(file.path().to_path_buf());
                }
                match self.engine.convert_to_hash(file) {
                    None => Prepare::Settled(file.clone()),
                    Some(Err(e)) => Prepare::NoMetadata(file.clone(), e),
                    Some(Ok(rename)) if in_own_hash_folder(&rename) => {
                        Prepare::Skipped(file.path().to_path_buf())
                    }
                    Some(Ok(rename)) => Prepare::Candidate(rename),
                }
            })
            .collect();

        let mut prepared = Prepared::default();
        for outcome in outcomes {
            match outcome {
                Prepare::Candidate(rename) => prepared.candidates.push(rename),
                Prepare::Settled(file) => prepared.settled.push(file),
                Prepare::Skipped(path) => {
                    prepared
                        .entries
                        .push(PlanEntry::new(path, None, FileState::Skipped));
                }
                Prepare::NoMetadata(file, error) => {
                    tracing::warn!("{}", error);
                    if file.kind() == MediaKind::Image {
                        prepared.no_metadata_images.push(file.path().to_path_buf());
                    }
                    prepared.entries.push(PlanEntry::new(
                        file.path().to_path_buf(),
                        None,
                        FileState::NoMetadataWarning,
                    ));
                    prepared.warnings.push(error);
                }
                Prepare::Cancelled(path) => {
                    prepared
                        .entries
                        .push(PlanEntry::new(path, None, FileState::Cancelled));
                }
            }
        }

        // Files already at their target lead their group, then path order
        prepared.candidates.sort_by(|a, b| {
            b.is_unchanged()
                .cmp(&a.is_unchanged())
                .then_with(|| a.original.path().cmp(b.original.path()))
        });

        tracing::info!(
            "Prepared {} rename candidates ({} already hashed, {} other files)",
            prepared.candidates.len(),
            prepared.settled.len(),
            prepared.entries.len()
        );

        prepared
    }

    /// Resolve candidates into actions.
    ///
    /// A file already sitting at a candidate's target joins that candidate's
    /// group as its unchanged first member, so it is deduplicated or moved
    /// into the hash folder like any other collision and never overwritten.
    pub fn analyze(&self, candidates: Vec<RenameFile>, settled: Vec<MediaFile>) -> Plan {
        let candidates: Vec<RenameFile> = if self.path_correction {
            candidates.into_iter().map(correct_date_folder).collect()
        } else {
            candidates
        };

        let (occupants, untouched) = self.occupants(&candidates, settled);
        let grouped = occupants.into_iter().chain(candidates).collect();
        let resolution = DuplicateResolver::new(self.fs).resolve(grouped);

        let mut plan = Plan {
            errors: resolution.errors,
            ..Default::default()
        };
        plan.unchanged.extend(
            untouched
                .into_iter()
                .map(|file| PlanEntry::new(file.path().to_path_buf(), None, FileState::Skipped)),
        );

        for action in resolution.actions {
            match action {
                FileAction::Rename(rename) if rename.is_unchanged() => {
                    plan.unchanged.push(PlanEntry::new(
                        rename.original.path().to_path_buf(),
                        None,
                        FileState::Resolved(ResolvedAction::KeepUnchanged),
                    ));
                }
                other => plan.actions.push(other),
            }
        }

        plan
    }

    /// Files occupying candidate targets, as unchanged renames onto themselves.
    ///
    /// Also returns the settled files no candidate collides with, by path.
    fn occupants(
        &self,
        candidates: &[RenameFile],
        settled: Vec<MediaFile>,
    ) -> (Vec<RenameFile>, Vec<MediaFile>) {
        let sources: HashSet<&Path> = candidates.iter().map(|c| c.original.path()).collect();
        let mut settled: HashMap<PathBuf, MediaFile> = settled
            .into_iter()
            .map(|file| (file.path().to_path_buf(), file))
            .collect();
        let mut claimed: HashSet<&Path> = HashSet::new();
        let mut occupants = Vec::new();

        for candidate in candidates {
            let target = candidate.renamed.path();
            if sources.contains(target) || claimed.contains(target) {
                continue;
            }
            let existing = match settled.remove(target) {
                Some(file) => file,
                None if self.fs.exists(target) => MediaFile::new(
                    candidate.renamed.kind(),
                    target.to_path_buf(),
                    candidate.renamed.metadata().clone(),
                ),
                None => continue,
            };

            tracing::debug!(
                "{} already exists, grouping it with {}",
                target.display(),
                candidate.original.path().display()
            );
            claimed.insert(target);
            occupants.push(RenameFile {
                original: existing,
                renamed: candidate.renamed.clone(),
            });
        }

        let mut untouched: Vec<MediaFile> = settled.into_values().collect();
        untouched.sort_by(|a, b| a.path().cmp(b.path()));
        (occupants, untouched)
    }
}

/// Whether the file already sits in a folder named after its hash
fn in_own_hash_folder(rename: &RenameFile) -> bool {
    let Some(hash) = rename.renamed.hash() else {
        return false;
    };
    rename
        .original
        .path()
        .parent()
        .and_then(Path::file_name)
        .is_some_and(|name| name == hash.as_str())
}

/// Move the rename target into the right `<yyyy>/<MM>` folder.
///
/// Only applies when the target already sits in a `<yyyy>/<MM>` layout and
/// the capture date disagrees with it.
fn correct_date_folder(rename: RenameFile) -> RenameFile {
    let Some(created) = rename.renamed.metadata().created_at() else {
        return rename;
    };
    let target = rename.renamed.path();
    let (Some(name), Some(month_dir)) = (target.file_name(), target.parent()) else {
        return rename;
    };
    let Some(year_dir) = month_dir.parent() else {
        return rename;
    };
    let Some(root) = year_dir.parent() else {
        return rename;
    };

    let (Some(month), Some(year)) = (
        month_dir.file_name().and_then(|n| n.to_str()).and_then(parse_month),
        year_dir.file_name().and_then(|n| n.to_str()).and_then(parse_year),
    ) else {
        return rename;
    };

    if year == created.year() && month == created.month() {
        return rename;
    }

    let corrected = root
        .join(format!("{:04}", created.year()))
        .join(format!("{:02}", created.month()))
        .join(name);

    tracing::debug!(
        "Correcting {} to {}",
        rename.original.path().display(),
        corrected.display()
    );

    RenameFile {
        renamed: rename.renamed.relocated(corrected),
        original: rename.original,
    }
}

fn parse_month(name: &str) -> Option<u32> {
    if name.len() != 2 || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok().filter(|m| (1..=12).contains(m))
}

fn parse_year(name: &str) -> Option<i32> {
    if name.len() != 4 || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fs::LocalFileSystem;
    use crate::core::metadata::{MetaAttribute, MetadataMap};

    fn dated(date: &str) -> MetadataMap {
        MetadataMap::from_pairs([
            (MetaAttribute::CreatedAt, date),
            (MetaAttribute::Model, "Canon"),
        ])
    }

    fn rename_for(path: &str, metadata: MetadataMap) -> RenameFile {
        let file = MediaFile::new(MediaKind::Image, PathBuf::from(path), metadata);
        HashEngine::default().convert_to_hash(&file).unwrap().unwrap()
    }

    #[test]
    fn month_and_year_parsing() {
        assert_eq!(parse_month("04"), Some(4));
        assert_eq!(parse_month("13"), None);
        assert_eq!(parse_month("4"), None);
        assert_eq!(parse_year("2022"), Some(2022));
        assert_eq!(parse_year("22"), None);
        assert_eq!(parse_year("abcd"), None);
    }

    #[test]
    fn wrong_date_folder_is_corrected() {
        let rename = rename_for("/lib/2021/12/IMG_1.jpg", dated("2022:04:01 14:16:48"));
        let corrected = correct_date_folder(rename);

        assert!(corrected.renamed.path().starts_with("/lib/2022/04"));
        assert_eq!(corrected.original.path(), Path::new("/lib/2021/12/IMG_1.jpg"));
    }

    #[test]
    fn matching_date_folder_is_left_alone() {
        let rename = rename_for("/lib/2022/04/IMG_1.jpg", dated("2022:04:01 14:16:48"));
        let target = rename.renamed.path().to_path_buf();
        assert_eq!(correct_date_folder(rename).renamed.path(), target);
    }

    #[test]
    fn non_date_layout_is_left_alone() {
        let rename = rename_for("/lib/holiday/IMG_1.jpg", dated("2022:04:01 14:16:48"));
        let target = rename.renamed.path().to_path_buf();
        assert_eq!(correct_date_folder(rename).renamed.path(), target);

        let rename = rename_for("/lib/2021/13/IMG_1.jpg", dated("2022:04:01 14:16:48"));
        let target = rename.renamed.path().to_path_buf();
        assert_eq!(correct_date_folder(rename).renamed.path(), target);
    }

    #[test]
    fn prepare_sorts_candidates_and_collects_no_metadata() {
        let fs = LocalFileSystem;
        let planner = RenamePlanner::new(HashEngine::default(), true, &fs);
        let files = vec![
            MediaFile::new(MediaKind::Image, PathBuf::from("/p/z.jpg"), dated("2022:04:01 14:16:48")),
            MediaFile::new(MediaKind::Image, PathBuf::from("/p/scan.png"), MetadataMap::default()),
            MediaFile::new(MediaKind::Video, PathBuf::from("/p/clip.mov"), MetadataMap::default()),
            MediaFile::new(MediaKind::Image, PathBuf::from("/p/a.jpg"), dated("2022:04:01 14:16:48")),
        ];

        let prepared = planner.prepare(&files, &CancellationToken::new());

        let order: Vec<_> = prepared.candidates.iter().map(|c| c.original.path()).collect();
        assert_eq!(order, vec![Path::new("/p/a.jpg"), Path::new("/p/z.jpg")]);
        assert_eq!(prepared.no_metadata_images, vec![PathBuf::from("/p/scan.png")]);
        assert_eq!(prepared.warnings.len(), 2);
        assert!(prepared
            .warnings
            .iter()
            .all(|w| matches!(w, FileError::NoMetadata { .. })));
        assert_eq!(
            prepared
                .entries
                .iter()
                .filter(|e| e.state == FileState::NoMetadataWarning)
                .count(),
            2
        );
    }

    #[test]
    fn file_inside_its_hash_folder_is_skipped() {
        let metadata = dated("2022:04:01 14:16:48");
        let hash = crate::core::naming::Hash::compute(MediaKind::Image, &metadata);
        let path = PathBuf::from("/p").join(hash.as_str()).join("IMG_1.jpg");
        let file = MediaFile::new(MediaKind::Image, path, metadata);

        let fs = LocalFileSystem;
        let planner = RenamePlanner::new(HashEngine::default(), false, &fs);
        let prepared = planner.prepare(&[file], &CancellationToken::new());

        assert!(prepared.candidates.is_empty());
        assert_eq!(prepared.entries[0].state, FileState::Skipped);
    }

    #[test]
    fn cancelled_prepare_marks_files() {
        let fs = LocalFileSystem;
        let planner = RenamePlanner::new(HashEngine::default(), false, &fs);
        let token = CancellationToken::new();
        token.cancel();

        let file = MediaFile::new(MediaKind::Image, PathBuf::from("/p/a.jpg"), dated("2022:04:01 14:16:48"));
        let prepared = planner.prepare(&[file], &token);

        assert_eq!(prepared.entries[0].state, FileState::Cancelled);
    }

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn hashed_files_are_settled() {
        let metadata = dated("2022:04:01 14:16:48");
        let name = crate::core::naming::Hash::compute(MediaKind::Image, &metadata).file_name("jpeg");
        let file = MediaFile::new(MediaKind::Image, PathBuf::from("/p").join(name), metadata);

        let fs = LocalFileSystem;
        let planner = RenamePlanner::new(HashEngine::default(), false, &fs);
        let prepared = planner.prepare(&[file], &CancellationToken::new());

        assert!(prepared.candidates.is_empty());
        assert!(prepared.entries.is_empty());
        assert_eq!(prepared.settled.len(), 1);
    }

    #[test]
    fn identical_file_at_target_removes_newcomer() {
        let dir = tempfile::TempDir::new().unwrap();
        let fs = LocalFileSystem;
        let planner = RenamePlanner::new(HashEngine::default(), false, &fs);

        let newcomer = rename_for(
            write(dir.path(), "b.jpg", &[5u8; 32]).to_str().unwrap(),
            dated("2022:04:01 14:16:48"),
        );
        let existing_path = newcomer.renamed.path().to_path_buf();
        std::fs::write(&existing_path, [5u8; 32]).unwrap();
        let existing = MediaFile::new(MediaKind::Image, existing_path.clone(), dated("2022:04:01 14:16:48"));

        let plan = planner.analyze(vec![newcomer], vec![existing]);

        assert!(plan.errors.is_empty());
        assert_eq!(plan.actions.len(), 1);
        match &plan.actions[0] {
            FileAction::Remove(removal) => {
                assert_eq!(removal.file.path(), dir.path().join("b.jpg"));
                assert_eq!(removal.duplicate_of.path(), existing_path);
            }
            other => panic!("expected a removal, got {:?}", other),
        }
        assert_eq!(
            plan.unchanged[0].state,
            FileState::Resolved(ResolvedAction::KeepUnchanged)
        );
    }

    #[test]
    fn different_file_at_target_sends_both_to_hash_folder() {
        let dir = tempfile::TempDir::new().unwrap();
        let fs = LocalFileSystem;
        let planner = RenamePlanner::new(HashEngine::default(), false, &fs);

        let newcomer = rename_for(
            write(dir.path(), "b.jpg", &[5u8; 900]).to_str().unwrap(),
            dated("2022:04:01 14:16:48"),
        );
        // Present on disk but not scanned
        std::fs::write(newcomer.renamed.path(), [1u8; 64]).unwrap();

        let plan = planner.analyze(vec![newcomer], Vec::new());

        assert_eq!(plan.actions.len(), 2);
        assert!(plan.actions.iter().all(|a| matches!(a, FileAction::Move(_))));
        assert!(plan.unchanged.is_empty());
    }

    #[test]
    fn uncontested_settled_files_are_skipped() {
        let fs = LocalFileSystem;
        let planner = RenamePlanner::new(HashEngine::default(), false, &fs);
        let settled = MediaFile::new(
            MediaKind::Image,
            PathBuf::from("/p/i_00000000.jpeg"),
            dated("2022:04:01 14:16:48"),
        );

        let plan = planner.analyze(Vec::new(), vec![settled]);

        assert!(plan.actions.is_empty());
        assert_eq!(plan.unchanged.len(), 1);
        assert_eq!(plan.unchanged[0].state, FileState::Skipped);
    }
}
