//! # Metadata Module
//!
//! Normalized metadata for photos and videos.
//!
//! Extractors speak their own vocabulary: EXIF yields `(directory, tag)`
//! descriptions, ffprobe yields container tag keys. Both are translated once,
//! at this boundary, into a [`MetadataMap`] keyed by [`MetaAttribute`].
//!
//! ## Extracted Attributes
//! - Capture date (`CreatedAt`, always in EXIF layout `yyyy:MM:dd HH:mm:ss`)
//! - Camera model
//! - GPS latitude, longitude, altitude, and the raw ISO 6709 string for videos
//! - Container major brand for videos

mod exif;
mod video;

pub use self::exif::{ExifExtractor, ExifTags};
pub use self::video::{parse_iso6709, VideoExtractor, VideoTags};

use crate::core::media::MediaKind;
use crate::error::MetadataError;
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// EXIF timestamp layout, also used for normalized video dates
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// The attributes the organizer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetaAttribute {
    CreatedAt,
    Model,
    GpsLatitude,
    GpsLongitude,
    GpsAltitude,
    GpsIso6709,
    MajorBrand,
}

impl MetaAttribute {
    pub const ALL: [MetaAttribute; 7] = [
        MetaAttribute::CreatedAt,
        MetaAttribute::Model,
        MetaAttribute::GpsLatitude,
        MetaAttribute::GpsLongitude,
        MetaAttribute::GpsAltitude,
        MetaAttribute::GpsIso6709,
        MetaAttribute::MajorBrand,
    ];
}

impl std::fmt::Display for MetaAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MetaAttribute::CreatedAt => "created at",
            MetaAttribute::Model => "camera model",
            MetaAttribute::GpsLatitude => "GPS latitude",
            MetaAttribute::GpsLongitude => "GPS longitude",
            MetaAttribute::GpsAltitude => "GPS altitude",
            MetaAttribute::GpsIso6709 => "GPS (ISO 6709)",
            MetaAttribute::MajorBrand => "major brand",
        };
        write!(f, "{}", name)
    }
}

/// Read-only attribute map for one file.
///
/// Blank values are never stored, so presence of a key means there is
/// something to work with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataMap {
    values: BTreeMap<MetaAttribute, String>,
}

impl MetadataMap {
    /// Build a map, dropping blank values
    pub fn from_pairs<I, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (MetaAttribute, V)>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(attr, value)| (attr, value.into().trim().to_string()))
            .filter(|(_, value)| !value.is_empty())
            .collect();
        Self { values }
    }

    pub fn get(&self, attribute: MetaAttribute) -> Option<&str> {
        self.values.get(&attribute).map(String::as_str)
    }

    pub fn contains(&self, attribute: MetaAttribute) -> bool {
        self.values.contains_key(&attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetaAttribute, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Capture date, when `CreatedAt` parses as an EXIF timestamp
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.get(MetaAttribute::CreatedAt)
            .and_then(|s| NaiveDateTime::parse_from_str(s.trim(), EXIF_DATETIME_FORMAT).ok())
    }

    /// Whether latitude, longitude and altitude are all present
    pub fn has_full_gps(&self) -> bool {
        self.contains(MetaAttribute::GpsLatitude)
            && self.contains(MetaAttribute::GpsLongitude)
            && self.contains(MetaAttribute::GpsAltitude)
    }

    /// Whether anything an identity hash is built from is present: a
    /// parsable capture date, a model or a full GPS position
    pub fn has_identity(&self) -> bool {
        self.created_at().is_some() || self.contains(MetaAttribute::Model) || self.has_full_gps()
    }

    /// Translate EXIF `(directory, tag)` descriptions
    pub fn from_exif_tags(tags: &ExifTags) -> Self {
        let lookup = |dir: &str, tag: &str| tags.get(&(dir.to_string(), tag.to_string())).cloned();

        let created = lookup("Exif", "DateTimeOriginal")
            .or_else(|| lookup("Exif", "DateTimeDigitized"))
            .or_else(|| lookup("IFD0", "DateTime"));

        let with_ref = |value: Option<String>, reference: Option<String>| {
            value.map(|v| match reference {
                Some(r) => format!("{} {}", v, r),
                None => v,
            })
        };

        let mut pairs = Vec::new();
        if let Some(created) = created {
            pairs.push((MetaAttribute::CreatedAt, created));
        }
        if let Some(model) = lookup("IFD0", "Model") {
            pairs.push((MetaAttribute::Model, model));
        }
        if let Some(lat) = with_ref(lookup("GPS", "GPSLatitude"), lookup("GPS", "GPSLatitudeRef")) {
            pairs.push((MetaAttribute::GpsLatitude, lat));
        }
        if let Some(lon) = with_ref(lookup("GPS", "GPSLongitude"), lookup("GPS", "GPSLongitudeRef")) {
            pairs.push((MetaAttribute::GpsLongitude, lon));
        }
        if let Some(alt) = lookup("GPS", "GPSAltitude") {
            pairs.push((MetaAttribute::GpsAltitude, alt));
        }

        Self::from_pairs(pairs)
    }

    /// Translate ffprobe container tags
    pub fn from_video_tags(tags: &VideoTags) -> Self {
        let lookup = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| tags.get(*k))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut pairs = Vec::new();

        if let Some(created) = lookup(&["com.apple.quicktime.creationdate", "creation_time"]) {
            if let Some(normalized) = normalize_video_date(&created) {
                pairs.push((MetaAttribute::CreatedAt, normalized));
            }
        }
        if let Some(model) = lookup(&["com.apple.quicktime.model", "model"]) {
            pairs.push((MetaAttribute::Model, model));
        }
        if let Some(location) = lookup(&["com.apple.quicktime.location.ISO6709", "location"]) {
            if let Some((lat, lon, alt)) = parse_iso6709(&location) {
                pairs.push((MetaAttribute::GpsLatitude, lat));
                pairs.push((MetaAttribute::GpsLongitude, lon));
                if let Some(alt) = alt {
                    pairs.push((MetaAttribute::GpsAltitude, alt));
                }
            }
            pairs.push((MetaAttribute::GpsIso6709, location));
        }
        if let Some(brand) = lookup(&["major_brand"]) {
            pairs.push((MetaAttribute::MajorBrand, brand));
        }

        Self::from_pairs(pairs)
    }
}

/// Convert an RFC 3339 container date into EXIF layout.
///
/// The local wall-clock time is kept, matching how cameras write EXIF dates.
fn normalize_video_date(value: &str) -> Option<String> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        let naive = dt.naive_local().with_nanosecond(0)?;
        return Some(naive.format(EXIF_DATETIME_FORMAT).to_string());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.format(EXIF_DATETIME_FORMAT).to_string())
}

/// Source of metadata for a single file
pub trait MetadataExtractor: Send + Sync {
    /// Read the metadata of `path`.
    ///
    /// Unsupported formats give an empty map, not an error. Errors are for
    /// files that cannot be read at all or tools that misbehave.
    fn extract(&self, path: &Path, kind: MediaKind) -> Result<MetadataMap, MetadataError>;
}

/// Dispatches images to EXIF and videos to ffprobe
pub struct MediaMetadataExtractor {
    exif: ExifExtractor,
    video: VideoExtractor,
}

impl MediaMetadataExtractor {
    pub fn new(video: VideoExtractor) -> Self {
        Self {
            exif: ExifExtractor,
            video,
        }
    }

    /// Extractor with ffprobe looked up on `PATH`
    pub fn detect() -> Self {
        Self::new(VideoExtractor::detect())
    }
}

impl MetadataExtractor for MediaMetadataExtractor {
    fn extract(&self, path: &Path, kind: MediaKind) -> Result<MetadataMap, MetadataError> {
        match kind {
            MediaKind::Image => {
                let tags = self.exif.read_tags(path)?;
                Ok(MetadataMap::from_exif_tags(&tags))
            }
            MediaKind::Video => {
                let tags = self.video.read_tags(path)?;
                Ok(MetadataMap::from_video_tags(&tags))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn exif(entries: &[(&str, &str, &str)]) -> ExifTags {
        entries
            .iter()
            .map(|(d, t, v)| ((d.to_string(), t.to_string()), v.to_string()))
            .collect()
    }

    #[test]
    fn blank_values_are_dropped() {
        let map = MetadataMap::from_pairs([
            (MetaAttribute::Model, "  "),
            (MetaAttribute::CreatedAt, "2022:04:01 14:16:48"),
        ]);
        assert_eq!(map.len(), 1);
        assert!(!map.contains(MetaAttribute::Model));
    }

    #[test]
    fn created_at_parses_exif_layout() {
        let map = MetadataMap::from_pairs([(MetaAttribute::CreatedAt, "2022:04:01 14:16:48")]);
        let dt = map.created_at().unwrap();
        assert_eq!(dt.format("%Y%m%dT%H%M%S").to_string(), "20220401T141648");
    }

    #[test]
    fn identity_needs_date_model_or_full_gps() {
        assert!(!MetadataMap::from_pairs([(MetaAttribute::MajorBrand, "qt")]).has_identity());
        assert!(!MetadataMap::from_pairs([(MetaAttribute::CreatedAt, "not a date")]).has_identity());
        assert!(!MetadataMap::from_pairs([(MetaAttribute::GpsLatitude, "52 N")]).has_identity());
        assert!(MetadataMap::from_pairs([(MetaAttribute::Model, "Canon")]).has_identity());
        assert!(MetadataMap::from_pairs([(MetaAttribute::CreatedAt, "2022:04:01 14:16:48")]).has_identity());
        assert!(MetadataMap::from_pairs([
            (MetaAttribute::GpsLatitude, "52 N"),
            (MetaAttribute::GpsLongitude, "4 E"),
            (MetaAttribute::GpsAltitude, "3"),
        ])
        .has_identity());
    }

    #[test]
    fn created_at_ignores_garbage() {
        let map = MetadataMap::from_pairs([(MetaAttribute::CreatedAt, "0000:00:00 00:00:00")]);
        assert!(map.created_at().is_none());
    }

    #[test]
    fn exif_translation_prefers_original_date() {
        let tags = exif(&[
            ("IFD0", "DateTime", "2023:01:01 00:00:00"),
            ("Exif", "DateTimeOriginal", "2022:04:01 14:16:48"),
            ("IFD0", "Model", "Canon EOS R5"),
        ]);
        let map = MetadataMap::from_exif_tags(&tags);
        assert_eq!(map.get(MetaAttribute::CreatedAt), Some("2022:04:01 14:16:48"));
        assert_eq!(map.get(MetaAttribute::Model), Some("Canon EOS R5"));
    }

    #[test]
    fn exif_translation_attaches_gps_reference() {
        let tags = exif(&[
            ("GPS", "GPSLatitude", "52 deg 22 min 12 sec"),
            ("GPS", "GPSLatitudeRef", "N"),
            ("GPS", "GPSLongitude", "4 deg 53 min 42 sec"),
            ("GPS", "GPSAltitude", "2 m"),
        ]);
        let map = MetadataMap::from_exif_tags(&tags);
        assert_eq!(map.get(MetaAttribute::GpsLatitude), Some("52 deg 22 min 12 sec N"));
        assert_eq!(map.get(MetaAttribute::GpsLongitude), Some("4 deg 53 min 42 sec"));
        assert!(map.has_full_gps());
    }

    #[test]
    fn empty_exif_gives_empty_map() {
        assert!(MetadataMap::from_exif_tags(&ExifTags::new()).is_empty());
    }

    #[test]
    fn video_translation_normalizes_date_and_location() {
        let tags: VideoTags = HashMap::from([
            ("creation_time".to_string(), "2021-07-14T09:30:05.000000Z".to_string()),
            ("major_brand".to_string(), "qt  ".to_string()),
            ("location".to_string(), "+37.7749-122.4194+010.000/".to_string()),
        ]);
        let map = MetadataMap::from_video_tags(&tags);

        assert_eq!(map.get(MetaAttribute::CreatedAt), Some("2021:07:14 09:30:05"));
        assert_eq!(map.get(MetaAttribute::MajorBrand), Some("qt"));
        assert_eq!(map.get(MetaAttribute::GpsLatitude), Some("+37.7749"));
        assert_eq!(map.get(MetaAttribute::GpsLongitude), Some("-122.4194"));
        assert_eq!(map.get(MetaAttribute::GpsAltitude), Some("+010.000"));
        assert_eq!(
            map.get(MetaAttribute::GpsIso6709),
            Some("+37.7749-122.4194+010.000/")
        );
    }

    #[test]
    fn metadata_map_survives_json() {
        let map = MetadataMap::from_pairs([
            (MetaAttribute::CreatedAt, "2022:04:01 14:16:48"),
            (MetaAttribute::Model, "Pixel 7"),
        ]);
        let json = serde_json::to_string(&map).unwrap();
        let back: MetadataMap = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }
}
