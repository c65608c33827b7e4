//! Types for similar image detection.

use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default minimum similarity percentage
pub const DEFAULT_THRESHOLD: f64 = 90.0;

/// Configuration for a similarity scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarConfig {
    /// Minimum similarity percentage for a pair to be reported
    pub threshold: f64,
}

impl Default for SimilarConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Two images whose thumbnails look alike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarPair {
    pub first: PathBuf,
    pub second: PathBuf,
    /// Percentage in `[0, 100]`
    pub similarity: f64,
}

/// Images connected through similar pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarGroup {
    pub id: String,
    /// Members in discovery order
    pub paths: Vec<PathBuf>,
    /// Highest similarity of any pair inside the group
    pub best_similarity: f64,
}

/// Result of a similarity scan
#[derive(Debug, Default)]
pub struct SimilarResult {
    /// Pairs above the threshold, most similar first
    pub pairs: Vec<SimilarPair>,
    pub groups: Vec<SimilarGroup>,
    pub total_images: usize,
    pub hashed_images: usize,
    /// Images that could not be decoded
    pub errors: Vec<HashError>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_ninety_percent() {
        assert_eq!(SimilarConfig::default().threshold, 90.0);
    }
}
