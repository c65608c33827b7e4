//! Executor for organization plans.

use super::types::*;
use crate::core::fs::FileSystem;
use crate::core::pipeline::CancellationToken;
use crate::error::FileError;
use crate::events::{Event, EventSender, ExecuteEvent};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

/// Executes organization plans
pub struct OrganizeExecutor<'a> {
    fs: &'a dyn FileSystem,
    operation: OperationMode,
    dry_run: bool,
}

impl<'a> OrganizeExecutor<'a> {
    pub fn new(fs: &'a dyn FileSystem, operation: OperationMode, dry_run: bool) -> Self {
        Self {
            fs,
            operation,
            dry_run,
        }
    }

    /// Copy or move every planned file, stopping early on cancellation
    pub fn execute(
        &self,
        plan: OrganizePlan,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> OrganizeResult {
        let start = Instant::now();
        let total = plan.files.len();

        events.send(Event::Execute(ExecuteEvent::Started {
            total_actions: total,
            dry_run: self.dry_run,
        }));

        let mut result = OrganizeResult {
            dry_run: self.dry_run,
            ..Default::default()
        };
        let mut created_dirs: HashSet<PathBuf> = HashSet::new();

        for (i, file) in plan.files.iter().enumerate() {
            if cancel.is_cancelled() {
                result.cancelled = true;
                break;
            }

            if self.dry_run {
                result.files_processed += 1;
                result.total_size_bytes += file.size_bytes;
                events.send(Event::Execute(ExecuteEvent::Applied {
                    completed: i + 1,
                    total,
                    source: file.source.clone(),
                    target: Some(file.destination.clone()),
                }));
                continue;
            }

            if let Some(parent) = file.destination.parent() {
                if !created_dirs.contains(parent) {
                    if !self.fs.exists(parent) {
                        result.folders_created += 1;
                    }
                    if let Err(e) = self.fs.ensure_directory(parent) {
                        self.fail(&mut result, events, FileError::runtime(parent, "create directory", e));
                        continue;
                    }
                    created_dirs.insert(parent.to_path_buf());
                }
            }

            let outcome = match self.operation {
                OperationMode::Copy => self
                    .fs
                    .copy_file(&file.source, &file.destination)
                    .map_err(|e| FileError::runtime(&file.source, "copy", e)),
                OperationMode::Move => self
                    .fs
                    .move_file(&file.source, &file.destination)
                    .map_err(|e| FileError::runtime(&file.source, "move", e)),
            };

            match outcome {
                Ok(()) => {
                    result.files_processed += 1;
                    result.total_size_bytes += file.size_bytes;
                    events.send(Event::Execute(ExecuteEvent::Applied {
                        completed: i + 1,
                        total,
                        source: file.source.clone(),
                        target: Some(file.destination.clone()),
                    }));
                }
                Err(error) => self.fail(&mut result, events, error),
            }
        }

        events.send(Event::Execute(ExecuteEvent::Completed {
            succeeded: result.files_processed,
            failed: result.errors.len(),
        }));

        result.plan = plan;
        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    fn fail(&self, result: &mut OrganizeResult, events: &EventSender, error: FileError) {
        tracing::warn!("{}", error);
        events.send(Event::Execute(ExecuteEvent::Failed {
            path: error.path().clone(),
            message: error.to_string(),
        }));
        result.errors.push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fs::LocalFileSystem;
    use crate::events::null_sender;
    use std::fs;
    use tempfile::TempDir;

    fn plan_for(source: PathBuf, destination: PathBuf) -> OrganizePlan {
        OrganizePlan {
            files: vec![PlannedFile {
                source,
                destination,
                date: None,
                size_bytes: 12,
                has_conflict: false,
            }],
            total_files: 1,
            total_size_bytes: 12,
            ..Default::default()
        }
    }

    #[test]
    fn copy_keeps_the_original() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let file = src.path().join("test.jpg");
        fs::write(&file, b"test content").unwrap();
        let target = dest.path().join("2024/01/test.jpg");

        let result = OrganizeExecutor::new(&LocalFileSystem, OperationMode::Copy, false).execute(
            plan_for(file.clone(), target.clone()),
            &null_sender(),
            &CancellationToken::new(),
        );

        assert_eq!(result.files_processed, 1);
        assert_eq!(result.folders_created, 1);
        assert!(file.exists());
        assert!(target.exists());
    }

    #[test]
    fn move_removes_the_original() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let file = src.path().join("test.jpg");
        fs::write(&file, b"test content").unwrap();
        let target = dest.path().join("2024/01/test.jpg");

        let result = OrganizeExecutor::new(&LocalFileSystem, OperationMode::Move, false).execute(
            plan_for(file.clone(), target.clone()),
            &null_sender(),
            &CancellationToken::new(),
        );

        assert_eq!(result.files_processed, 1);
        assert!(!file.exists());
        assert!(target.exists());
    }

    #[test]
    fn missing_source_is_reported() {
        let dest = TempDir::new().unwrap();
        let result = OrganizeExecutor::new(&LocalFileSystem, OperationMode::Copy, false).execute(
            plan_for("/nonexistent/file.jpg".into(), dest.path().join("2024/01/file.jpg")),
            &null_sender(),
            &CancellationToken::new(),
        );

        assert_eq!(result.files_processed, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.has_failures());
    }

    #[test]
    fn dry_run_creates_nothing() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let file = src.path().join("test.jpg");
        fs::write(&file, b"test content").unwrap();
        let target = dest.path().join("2024/01/test.jpg");

        let result = OrganizeExecutor::new(&LocalFileSystem, OperationMode::Move, true).execute(
            plan_for(file.clone(), target.clone()),
            &null_sender(),
            &CancellationToken::new(),
        );

        assert_eq!(result.files_processed, 1);
        assert!(file.exists());
        assert!(!dest.path().join("2024").exists());
    }
}
