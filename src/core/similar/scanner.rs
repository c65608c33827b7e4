//! Hashes a set of images and reports the similar ones.

use super::grouper::SimilarityGrouper;
use super::types::*;
use crate::core::perceptual::{ImageHash, PerceptualHasher};
use crate::core::pipeline::CancellationToken;
use crate::error::HashError;
use crate::events::{CompareEvent, Event, EventSender, PipelineEvent, PipelinePhase, ProgressCounter};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

/// Runs perceptual hashing and pairwise comparison
pub struct SimilarScanner {
    config: SimilarConfig,
}

impl SimilarScanner {
    pub fn new(config: SimilarConfig) -> Self {
        Self { config }
    }

    pub fn scan(
        &self,
        images: &[PathBuf],
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> SimilarResult {
        let start = Instant::now();

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Comparing,
        }));
        events.send(Event::Compare(CompareEvent::Started {
            total_images: images.len(),
            total_comparisons: images.len() * images.len().saturating_sub(1) / 2,
        }));

        let progress = ProgressCounter::new(images.len());

        let outcomes: Vec<Option<Result<ImageHash, HashError>>> = images
            .par_iter()
            .map(|path| {
                if cancel.is_cancelled() {
                    return None;
                }
                let hash = PerceptualHasher::hash_file(path);
                events.send(Event::Compare(CompareEvent::Hashed {
                    completed: progress.tick(),
                    total: progress.total(),
                }));
                Some(hash)
            })
            .collect();

        let mut hashes = Vec::with_capacity(images.len());
        let mut errors = Vec::new();
        for (path, outcome) in images.iter().zip(outcomes) {
            match outcome {
                Some(Ok(hash)) => hashes.push((path.clone(), hash)),
                Some(Err(e)) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    errors.push(e);
                }
                None => {}
            }
        }

        let grouper = SimilarityGrouper::new(self.config.threshold);
        let pairs = if cancel.is_cancelled() {
            Vec::new()
        } else {
            grouper.group(&hashes)
        };
        let groups = grouper.clusters(&hashes, &pairs);

        tracing::info!(
            "Compared {} images, {} similar pairs in {} groups",
            hashes.len(),
            pairs.len(),
            groups.len()
        );

        events.send(Event::Compare(CompareEvent::Completed {
            similar_pairs: pairs.len(),
        }));

        SimilarResult {
            pairs,
            groups,
            total_images: images.len(),
            hashed_images: hashes.len(),
            errors,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

impl Default for SimilarScanner {
    fn default() -> Self {
        Self::new(SimilarConfig::default())
    }
}
