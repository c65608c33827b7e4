//! # Naming Module
//!
//! Deterministic identity names derived from metadata.
//!
//! A [`Hash`] is built from the media kind, the capture date and a CRC-32 of
//! either the camera model or the GPS position:
//!
//! ```text
//! i_20220401T141648_1b2c3d4e.jpeg
//! │ │               └ crc32 of model (or lat--lon--alt)
//! │ └ capture date, omitted when unknown
//! └ kind prefix
//! ```
//!
//! Two files with the same kind, date, model and position always get the same
//! name. That is what makes renaming idempotent and duplicates detectable.

mod engine;
mod file_name;

pub use engine::{HashEngine, RenameFile};
pub use file_name::FileName;

use crate::core::media::MediaKind;
use crate::core::metadata::{MetaAttribute, MetadataMap};
use serde::{Deserialize, Serialize};

/// Characters that never appear in a hash
const FORBIDDEN: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>', '.', ',', ';', '='];

/// Identity string of a media file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash(String);

impl Hash {
    /// Derive the identity of a file from its kind and metadata
    pub fn compute(kind: MediaKind, metadata: &MetadataMap) -> Self {
        let mut clear = kind.prefix().to_string();
        if let Some(created) = metadata.created_at() {
            clear.push('_');
            clear.push_str(&created.format("%Y%m%dT%H%M%S").to_string());
        }

        let crypted = format!("{:08x}", crc32fast::hash(identity_input(metadata).as_bytes()));

        Self(sanitize(&format!("{}_{}", clear, crypted)))
    }

    /// Wrap an already-derived hash, e.g. one parsed from a file name
    pub(crate) fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name for this hash with the given extension
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Model if present, else the full GPS triple, else nothing
fn identity_input(metadata: &MetadataMap) -> String {
    if let Some(model) = metadata.get(MetaAttribute::Model) {
        return strip_whitespace(model);
    }

    match (
        metadata.get(MetaAttribute::GpsLatitude),
        metadata.get(MetaAttribute::GpsLongitude),
        metadata.get(MetaAttribute::GpsAltitude),
    ) {
        (Some(lat), Some(lon), Some(alt)) => strip_whitespace(&format!("{}--{}--{}", lat, lon, alt)),
        _ => String::new(),
    }
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !FORBIDDEN.contains(c) && !c.is_control())
        .collect()
}
