//! # Similar Images Module
//!
//! Finds images that look alike, for files with no metadata to name them by.
//!
//! Each image is reduced to a perceptual hash; every pair is compared and
//! pairs at or above the threshold (90% by default) are reported, then merged
//! into groups for review.

mod grouper;
mod scanner;
mod types;

pub use grouper::SimilarityGrouper;
pub use scanner::SimilarScanner;
pub use types::{SimilarConfig, SimilarGroup, SimilarPair, SimilarResult, DEFAULT_THRESHOLD};
