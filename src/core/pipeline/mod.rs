//! # Pipeline Module
//!
//! Orchestrates a rename run.
//!
//! ## Stages
//! 1. **Scan** - Discover media files in the given directories
//! 2. **Read** - Load metadata (with caching)
//! 3. **Prepare** - Derive a hash name for every file
//! 4. **Analyze** - Fix date folders and resolve name collisions
//! 5. **Execute** - Apply renames, moves and removals
//!
//! Each stage finishes for every file before the next starts.
//!
//! ## Parallelism
//! Uses rayon for per-file work inside each stage.

mod executor;
mod planner;
mod runner;
mod types;

pub use executor::{Execution, PlanExecutor};
pub use planner::{Plan, Prepared, RenamePlanner};
pub use runner::{validate_roots, RenameConfig, RenamePipeline, RenamePipelineBuilder};
pub use types::{
    CancellationToken, FileState, PlanEntry, RenameReport, ReportCounts, ResolvedAction,
};
