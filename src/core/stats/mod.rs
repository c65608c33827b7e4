//! # Stats Module
//!
//! Metadata coverage of a set of media files: how many carry a capture
//! date, a camera model or a full GPS fix, and which models and years
//! dominate.

use crate::core::media::{MediaFile, MediaKind};
use crate::core::metadata::MetaAttribute;
use crate::core::naming::FileName;
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregated metadata coverage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataStats {
    pub total: usize,
    pub images: usize,
    pub videos: usize,
    pub with_created_at: usize,
    pub with_model: usize,
    /// Latitude, longitude and altitude all present
    pub with_gps: usize,
    pub without_metadata: usize,
    /// Files already named after their hash
    pub hashed_names: usize,
    pub by_model: BTreeMap<String, usize>,
    pub by_year: BTreeMap<i32, usize>,
}

impl MetadataStats {
    pub fn collect(files: &[MediaFile]) -> Self {
        let mut stats = Self::default();
        for file in files {
            stats.add(file);
        }
        stats
    }

    fn add(&mut self, file: &MediaFile) {
        self.total += 1;
        match file.kind() {
            MediaKind::Image => self.images += 1,
            MediaKind::Video => self.videos += 1,
        }

        if FileName::from_path(file.path()).is_hashed() {
            self.hashed_names += 1;
        }

        let metadata = file.metadata();
        if metadata.is_empty() {
            self.without_metadata += 1;
            return;
        }

        if let Some(created) = metadata.created_at() {
            self.with_created_at += 1;
            *self.by_year.entry(created.year()).or_default() += 1;
        }
        if let Some(model) = metadata.get(MetaAttribute::Model) {
            self.with_model += 1;
            *self.by_model.entry(model.to_string()).or_default() += 1;
        }
        if metadata.has_full_gps() {
            self.with_gps += 1;
        }
    }

    /// Models ordered by file count, most common first
    pub fn top_models(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut models: Vec<(&str, usize)> = self
            .by_model
            .iter()
            .map(|(model, count)| (model.as_str(), *count))
            .collect();
        models.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        models.truncate(limit);
        models
    }

    /// Share of files with at least one metadata value, in percent
    pub fn coverage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.total - self.without_metadata) as f64 / self.total as f64 * 100.0
    }
}
