//! # Core Module
//!
//! The UI-agnostic organizing engine.
//!
//! ## Modules
//! - `scanner` - Discovers images and videos in directories
//! - `metadata` - Extracts EXIF and video container tags
//! - `loader` - Reads metadata for many files, with caching
//! - `cache` - Persists metadata to avoid re-reading files
//! - `naming` - Derives identity names from metadata
//! - `resolver` - Classifies name collisions into rename/remove/move
//! - `pipeline` - Orchestrates a rename run
//! - `perceptual` - Pixel fingerprints of images
//! - `similar` - Finds look-alike images among the unnamed ones
//! - `organize` - Files media into a year/month layout
//! - `stats` - Metadata coverage summaries
//! - `fs` - Filesystem operations behind a trait

pub mod cache;
pub mod fs;
pub mod loader;
pub mod media;
pub mod metadata;
pub mod naming;
pub mod organize;
pub mod perceptual;
pub mod pipeline;
pub mod resolver;
pub mod scanner;
pub mod similar;
pub mod stats;

// Re-export commonly used types
pub use media::{MediaFile, MediaKind};
pub use metadata::{MetaAttribute, MetadataMap};
pub use naming::{Hash, HashEngine, RenameFile};
pub use pipeline::{CancellationToken, RenamePipeline, RenameReport};
pub use resolver::FileAction;
