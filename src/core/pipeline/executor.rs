//! Applies a resolved plan to the filesystem.

use super::types::{CancellationToken, FileState, PlanEntry, ResolvedAction};
use crate::core::fs::FileSystem;
use crate::core::resolver::FileAction;
use crate::error::FileError;
use crate::events::{Event, EventSender, ExecuteEvent, ProgressCounter};
use rayon::prelude::*;
use std::io;
use std::path::Path;

/// Entries and failures of an execution
#[derive(Debug, Default)]
pub struct Execution {
    pub entries: Vec<PlanEntry>,
    pub errors: Vec<FileError>,
}

impl Execution {
    fn merge(mut self, other: Execution) -> Execution {
        self.entries.extend(other.entries);
        self.errors.extend(other.errors);
        self
    }
}

/// Runs rename, move and remove batches side by side
pub struct PlanExecutor<'a> {
    fs: &'a dyn FileSystem,
    dry_run: bool,
    force: bool,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self {
            fs,
            dry_run: false,
            force: false,
        }
    }

    /// Report what would happen without touching any file
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Overwrite existing targets
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn execute(
        &self,
        actions: &[FileAction],
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Execution {
        events.send(Event::Execute(ExecuteEvent::Started {
            total_actions: actions.len(),
            dry_run: self.dry_run,
        }));

        let progress = ProgressCounter::new(actions.len());

        let renames: Vec<&FileAction> = actions.iter().filter(|a| matches!(a, FileAction::Rename(_))).collect();
        let moves: Vec<&FileAction> = actions.iter().filter(|a| matches!(a, FileAction::Move(_))).collect();
        let removals: Vec<&FileAction> = actions.iter().filter(|a| matches!(a, FileAction::Remove(_))).collect();

        let (renamed, (moved, removed)) = rayon::join(
            || self.run_batch(&renames, events, cancel, &progress),
            || {
                rayon::join(
                    || self.run_batch(&moves, events, cancel, &progress),
                    || self.run_batch(&removals, events, cancel, &progress),
                )
            },
        );

        let execution = renamed.merge(moved).merge(removed);

        let failed = execution.errors.len();
        events.send(Event::Execute(ExecuteEvent::Completed {
            succeeded: execution
                .entries
                .iter()
                .filter(|e| matches!(e.state, FileState::Resolved(_)))
                .count(),
            failed,
        }));

        execution
    }

    fn run_batch(
        &self,
        batch: &[&FileAction],
        events: &EventSender,
        cancel: &CancellationToken,
        progress: &ProgressCounter,
    ) -> Execution {
        let outcomes: Vec<(PlanEntry, Option<FileError>)> = batch
            .par_iter()
            .map(|action| {
                let mut entry = PlanEntry::new(
                    action.source().to_path_buf(),
                    action.target().map(Path::to_path_buf),
                    FileState::Cancelled,
                );
                if let FileAction::Remove(remove) = action {
                    entry.duplicate_of = Some(remove.duplicate_of.path().to_path_buf());
                }

                if cancel.is_cancelled() {
                    return (entry, None);
                }

                let outcome = if self.dry_run {
                    Ok(())
                } else {
                    self.apply(action)
                };

                match outcome {
                    Ok(()) => {
                        entry.state = FileState::Resolved(resolved_action(action));
                        events.send(Event::Execute(ExecuteEvent::Applied {
                            completed: progress.tick(),
                            total: progress.total(),
                            source: entry.source.clone(),
                            target: entry.target.clone(),
                        }));
                        (entry, None)
                    }
                    Err(error) => {
                        progress.tick();
                        tracing::warn!("{}", error);
                        events.send(Event::Execute(ExecuteEvent::Failed {
                            path: entry.source.clone(),
                            message: error.to_string(),
                        }));
                        entry.state = FileState::Failed;
                        (entry, Some(error))
                    }
                }
            })
            .collect();

        let mut execution = Execution::default();
        for (entry, error) in outcomes {
            execution.entries.push(entry);
            execution.errors.extend(error);
        }
        execution
    }

    fn apply(&self, action: &FileAction) -> Result<(), FileError> {
        match action {
            FileAction::Rename(rename) => {
                self.relocate(rename.original.path(), rename.renamed.path(), "rename")
            }
            FileAction::Move(to_move) => self.relocate(to_move.file.path(), &to_move.target, "move"),
            FileAction::Remove(remove) => {
                let path = remove.file.path();
                self.fs
                    .delete(path)
                    .map_err(|e| FileError::runtime(path, "delete", e))
            }
        }
    }

    fn relocate(&self, from: &Path, to: &Path, operation: &'static str) -> Result<(), FileError> {
        if from == to {
            return Ok(());
        }
        if !self.force && self.fs.exists(to) {
            return Err(FileError::runtime(
                from,
                operation,
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists (use --force to overwrite)", to.display()),
                ),
            ));
        }
        if let Some(parent) = to.parent() {
            self.fs
                .ensure_directory(parent)
                .map_err(|e| FileError::runtime(parent, "create directory", e))?;
        }
        self.fs
            .move_file(from, to)
            .map_err(|e| FileError::runtime(from, operation, e))
    }
}

fn resolved_action(action: &FileAction) -> ResolvedAction {
    match action {
        FileAction::Rename(_) => ResolvedAction::Rename,
        FileAction::Remove(_) => ResolvedAction::Remove,
        FileAction::Move(_) => ResolvedAction::Move,
    }
}
