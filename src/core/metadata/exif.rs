//! EXIF reader for still images.

use crate::error::MetadataError;
use exif::{Context, Field, In, Reader, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Tag descriptions keyed by `(directory, tag name)`
pub type ExifTags = HashMap<(String, String), String>;

/// Reads EXIF from the primary image of a file
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifExtractor;

impl ExifExtractor {
    /// Read every primary-image tag as a `(directory, tag) -> description` map.
    ///
    /// Files without EXIF (or in formats without EXIF support) give an empty
    /// map. Only I/O failures are errors.
    pub fn read_tags(&self, path: &Path) -> Result<ExifTags, MetadataError> {
        let file = File::open(path).map_err(|e| MetadataError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut reader = BufReader::new(file);
        let exif = match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(exif::Error::Io(e)) => {
                return Err(MetadataError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                tracing::debug!("No EXIF in {}: {}", path.display(), e);
                return Ok(ExifTags::new());
            }
        };

        let tags = exif
            .fields()
            .filter(|field| field.ifd_num == In::PRIMARY)
            .filter_map(|field| {
                let directory = directory_name(field)?;
                let value = describe(field, &exif)?;
                Some(((directory.to_string(), field.tag.to_string()), value))
            })
            .collect();

        Ok(tags)
    }
}

fn directory_name(field: &Field) -> Option<&'static str> {
    let context = field.tag.context();
    if context == Context::Tiff {
        Some("IFD0")
    } else if context == Context::Exif {
        Some("Exif")
    } else if context == Context::Gps {
        Some("GPS")
    } else if context == Context::Interop {
        Some("Interop")
    } else {
        None
    }
}

/// Text form of a field; ASCII values are taken verbatim, others are rendered
/// with their unit
fn describe(field: &Field, exif: &exif::Exif) -> Option<String> {
    let text = match field.value {
        Value::Ascii(ref parts) => {
            let bytes = parts.first()?;
            String::from_utf8_lossy(bytes)
                .trim_end_matches('\0')
                .trim()
                .to_string()
        }
        _ => field.display_value().with_unit(exif).to_string(),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
