//! Container tags for videos, read through `ffprobe`.

use crate::error::MetadataError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Raw container tags (`format.tags` in ffprobe output)
pub type VideoTags = HashMap<String, String>;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    tags: HashMap<String, serde_json::Value>,
}

/// Reads video container tags with an external `ffprobe` binary.
///
/// Without the binary every video simply has no metadata.
#[derive(Debug, Clone, Default)]
pub struct VideoExtractor {
    ffprobe: Option<PathBuf>,
}

impl VideoExtractor {
    pub fn new(ffprobe: Option<PathBuf>) -> Self {
        Self { ffprobe }
    }

    /// Look for `ffprobe` on `PATH`
    pub fn detect() -> Self {
        let available = Command::new("ffprobe")
            .arg("-version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);

        if available {
            tracing::debug!("Using ffprobe for video metadata");
            Self::new(Some(PathBuf::from("ffprobe")))
        } else {
            tracing::warn!("ffprobe not found; videos will have no metadata");
            Self::new(None)
        }
    }

    pub fn is_available(&self) -> bool {
        self.ffprobe.is_some()
    }

    pub fn read_tags(&self, path: &Path) -> Result<VideoTags, MetadataError> {
        let Some(ffprobe) = &self.ffprobe else {
            return Ok(VideoTags::new());
        };

        let output = Command::new(ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .map_err(|e| MetadataError::ToolFailed {
                tool: "ffprobe".to_string(),
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            // ffprobe exits non-zero for files it cannot parse as media
            tracing::debug!("ffprobe rejected {}", path.display());
            return Ok(VideoTags::new());
        }

        parse_probe_output(&output.stdout).map_err(|reason| MetadataError::ToolFailed {
            tool: "ffprobe".to_string(),
            path: path.to_path_buf(),
            reason,
        })
    }
}

fn parse_probe_output(stdout: &[u8]) -> Result<VideoTags, String> {
    let probe: ProbeOutput = serde_json::from_slice(stdout).map_err(|e| e.to_string())?;

    let tags = probe
        .format
        .map(|format| format.tags)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(s) => Some((key, s)),
            serde_json::Value::Number(n) => Some((key, n.to_string())),
            _ => None,
        })
        .collect();

    Ok(tags)
}

/// Split an ISO 6709 location (`+37.7749-122.4194+010.000/`) into
/// latitude, longitude and optional altitude, keeping their signs.
pub fn parse_iso6709(value: &str) -> Option<(String, String, Option<String>)> {
    let body = value.trim().trim_end_matches('/');

    let mut parts = Vec::new();
    let mut current = String::new();
    for c in body.chars() {
        if (c == '+' || c == '-') && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }

    let valid = |p: &String| {
        p.len() > 1
            && (p.starts_with('+') || p.starts_with('-'))
            && p[1..].parse::<f64>().is_ok()
    };

    match parts.as_slice() {
        [lat, lon] if valid(lat) && valid(lon) => Some((lat.clone(), lon.clone(), None)),
        [lat, lon, alt] if valid(lat) && valid(lon) && valid(alt) => {
            Some((lat.clone(), lon.clone(), Some(alt.clone())))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_gives_empty_tags() {
        let extractor = VideoExtractor::new(None);
        let tags = extractor.read_tags(Path::new("/videos/clip.mov")).unwrap();
        assert!(tags.is_empty());
        assert!(!extractor.is_available());
    }

    #[test]
    fn probe_output_tags_are_read() {
        let json = br#"{
            "format": {
                "filename": "clip.mov",
                "tags": {
                    "major_brand": "qt  ",
                    "creation_time": "2021-07-14T09:30:05.000000Z",
                    "com.apple.quicktime.model": "iPhone 12"
                }
            }
        }"#;
        let tags = parse_probe_output(json).unwrap();
        assert_eq!(tags.get("major_brand").map(String::as_str), Some("qt  "));
        assert_eq!(
            tags.get("com.apple.quicktime.model").map(String::as_str),
            Some("iPhone 12")
        );
    }

    #[test]
    fn probe_output_without_format_is_empty() {
        assert!(parse_probe_output(b"{}").unwrap().is_empty());
    }

    #[test]
    fn invalid_probe_output_is_an_error() {
        assert!(parse_probe_output(b"not json").is_err());
    }

    #[test]
    fn iso6709_with_altitude() {
        let (lat, lon, alt) = parse_iso6709("+37.7749-122.4194+010.000/").unwrap();
        assert_eq!(lat, "+37.7749");
        assert_eq!(lon, "-122.4194");
        assert_eq!(alt.as_deref(), Some("+010.000"));
    }

    #[test]
    fn iso6709_without_altitude() {
        let (lat, lon, alt) = parse_iso6709("-33.8688+151.2093/").unwrap();
        assert_eq!(lat, "-33.8688");
        assert_eq!(lon, "+151.2093");
        assert!(alt.is_none());
    }

    #[test]
    fn iso6709_rejects_garbage() {
        assert!(parse_iso6709("somewhere nice").is_none());
        assert!(parse_iso6709("").is_none());
    }
}
