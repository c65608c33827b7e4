//! Pairwise comparison of perceptual hashes.

use super::types::{SimilarGroup, SimilarPair, DEFAULT_THRESHOLD};
use crate::core::perceptual::{ImageHash, PerceptualHasher};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Finds pairs of images above a similarity threshold.
///
/// Every pair is compared, so cost grows quadratically with the input.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityGrouper {
    threshold: f64,
}

impl SimilarityGrouper {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// All pairs `(i, j)` with `i < j` at or above the threshold, most
    /// similar first. Equal scores keep discovery order.
    pub fn group(&self, hashes: &[(PathBuf, ImageHash)]) -> Vec<SimilarPair> {
        let rows: Vec<Vec<SimilarPair>> = (0..hashes.len())
            .into_par_iter()
            .map(|i| {
                let (first_path, first_hash) = &hashes[i];
                hashes[i + 1..]
                    .iter()
                    .filter_map(|(second_path, second_hash)| {
                        let similarity = PerceptualHasher::compare(first_hash, second_hash);
                        (similarity >= self.threshold).then(|| SimilarPair {
                            first: first_path.clone(),
                            second: second_path.clone(),
                            similarity,
                        })
                    })
                    .collect()
            })
            .collect();

        let mut pairs: Vec<SimilarPair> = rows.into_iter().flatten().collect();
        pairs.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        pairs
    }

    /// Merge pairs into connected groups, ordered by first appearance
    pub fn clusters(&self, hashes: &[(PathBuf, ImageHash)], pairs: &[SimilarPair]) -> Vec<SimilarGroup> {
        let index: HashMap<&PathBuf, usize> = hashes
            .iter()
            .enumerate()
            .map(|(i, (path, _))| (path, i))
            .collect();

        let mut parent: Vec<usize> = (0..hashes.len()).collect();

        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        let mut best: HashMap<usize, f64> = HashMap::new();
        for pair in pairs {
            let (Some(&a), Some(&b)) = (index.get(&pair.first), index.get(&pair.second)) else {
                continue;
            };
            let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
            let (root, child) = if ra <= rb { (ra, rb) } else { (rb, ra) };
            parent[child] = root;

            let merged = [best.remove(&ra), best.remove(&rb), Some(pair.similarity)]
                .into_iter()
                .flatten()
                .fold(0.0_f64, f64::max);
            best.insert(root, merged);
        }

        let mut members: Vec<(usize, Vec<PathBuf>)> = Vec::new();
        let mut slot: HashMap<usize, usize> = HashMap::new();
        for (i, (path, _)) in hashes.iter().enumerate() {
            let root = find(&mut parent, i);
            let position = *slot.entry(root).or_insert_with(|| {
                members.push((root, Vec::new()));
                members.len() - 1
            });
            members[position].1.push(path.clone());
        }

        members
            .into_iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(root, paths)| SimilarGroup {
                id: Uuid::new_v4().to_string(),
                paths,
                best_similarity: best.get(&root).copied().unwrap_or(0.0),
            })
            .collect()
    }
}

impl Default for SimilarityGrouper {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashed(name: &str, values: Vec<u32>) -> (PathBuf, ImageHash) {
        (PathBuf::from(name), ImageHash::new(values))
    }

    #[test]
    fn identical_hashes_pair_up() {
        let input = vec![hashed("a", vec![100, 200]), hashed("b", vec![100, 200])];
        let pairs = SimilarityGrouper::default().group(&input);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first, PathBuf::from("a"));
        assert_eq!(pairs[0].second, PathBuf::from("b"));
        assert_eq!(pairs[0].similarity, 100.0);
    }

    #[test]
    fn pairs_below_threshold_are_dropped() {
        let input = vec![hashed("a", vec![100]), hashed("b", vec![50])];
        assert!(SimilarityGrouper::default().group(&input).is_empty());
        assert_eq!(SimilarityGrouper::new(50.0).group(&input).len(), 1);
    }

    #[test]
    fn pairs_are_sorted_by_similarity_with_stable_ties() {
        let input = vec![
            hashed("a", vec![100]),
            hashed("b", vec![95]),
            hashed("c", vec![100]),
        ];
        let pairs = SimilarityGrouper::new(90.0).group(&input);

        let names: Vec<_> = pairs
            .iter()
            .map(|p| (p.first.to_string_lossy().into_owned(), p.second.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a".to_string(), "c".to_string()),
                ("a".to_string(), "b".to_string()),
                ("b".to_string(), "c".to_string()),
            ]
        );
    }

    #[test]
    fn different_lengths_never_pair() {
        let input = vec![hashed("a", vec![1, 2]), hashed("b", vec![1])];
        assert!(SimilarityGrouper::new(0.5).group(&input).is_empty());
    }

    #[test]
    fn clusters_merge_transitively() {
        let input = vec![
            hashed("a", vec![100]),
            hashed("lonely", vec![1]),
            hashed("b", vec![92]),
            hashed("c", vec![85]),
        ];
        let grouper = SimilarityGrouper::new(90.0);
        let pairs = grouper.group(&input);
        let groups = grouper.clusters(&input, &pairs);

        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].paths,
            vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );
        assert!(groups[0].best_similarity >= 92.0);
    }
}
