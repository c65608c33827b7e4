//! Plan generator for organization operations.

use super::types::*;
use crate::core::fs::{unique_path, FileSystem};
use crate::core::media::MediaFile;
use crate::error::FileError;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Generates organization plans
pub struct OrganizePlanner<'a> {
    target: &'a Path,
    fallback: &'a str,
    force: bool,
    fs: &'a dyn FileSystem,
}

impl<'a> OrganizePlanner<'a> {
    pub fn new(config: &'a OrganizeConfig, fs: &'a dyn FileSystem) -> Self {
        Self {
            target: &config.target,
            fallback: &config.fallback,
            force: config.force,
            fs,
        }
    }

    /// Build the plan for `files`, in input order.
    ///
    /// Files whose size cannot be read are returned as errors and left out.
    pub fn plan(&self, files: &[MediaFile]) -> (OrganizePlan, Vec<FileError>) {
        let mut plan = OrganizePlan::default();
        let mut errors = Vec::new();
        let mut reserved: HashSet<PathBuf> = HashSet::new();
        let mut by_year: BTreeMap<i32, (usize, u64)> = BTreeMap::new();

        for file in files {
            let size = match self.fs.file_size(file.path()) {
                Ok(size) => size,
                Err(e) => {
                    errors.push(FileError::runtime(file.path(), "read size of", e));
                    continue;
                }
            };

            let date = file.metadata().created_at().map(|dt| dt.date());
            let wanted = self.folder_for(date).join(file.original_name());

            if wanted == file.path() {
                plan.in_place += 1;
                reserved.insert(wanted);
                continue;
            }

            let destination = unique_path(&wanted, |candidate| {
                reserved.contains(candidate) || (!self.force && self.fs.exists(candidate))
            });
            let has_conflict = destination != wanted;
            reserved.insert(destination.clone());

            match date {
                Some(d) => {
                    plan.date_range = Some(match plan.date_range {
                        Some((earliest, latest)) => (earliest.min(d), latest.max(d)),
                        None => (d, d),
                    });
                    let entry = by_year.entry(d.year()).or_insert((0, 0));
                    entry.0 += 1;
                    entry.1 += size;
                }
                None => plan.no_date_count += 1,
            }

            if has_conflict {
                plan.conflict_count += 1;
            }
            plan.total_size_bytes += size;
            plan.files.push(PlannedFile {
                source: file.path().to_path_buf(),
                destination,
                date,
                size_bytes: size,
                has_conflict,
            });
        }

        plan.total_files = plan.files.len();
        plan.by_year = by_year
            .into_iter()
            .rev()
            .map(|(year, (count, size_bytes))| YearSummary {
                year,
                count,
                size_bytes,
            })
            .collect();

        (plan, errors)
    }

    fn folder_for(&self, date: Option<NaiveDate>) -> PathBuf {
        match date {
            Some(d) => self
                .target
                .join(format!("{:04}", d.year()))
                .join(format!("{:02}", d.month())),
            None => self.target.join(self.fallback),
        }
    }
}
