//! Recognizing names that are already hashes.

use super::Hash;
use crate::core::media::MediaKind;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn hashed_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<hash>(?P<kind>[iv])_(?:\d{8}T\d{6}_)?[0-9a-f]{8})\.(?P<ext>[A-Za-z0-9]+)$")
            .expect("hashed name pattern is valid")
    })
}

/// A file name, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileName {
    /// `<prefix>_[<date>_]<crc>.<ext>` with an extension matching the prefix
    Hashed { hash: Hash, extension: String },
    /// Anything else
    Normal(String),
}

impl FileName {
    pub fn parse(name: &str) -> Self {
        if let Some(caps) = hashed_name_pattern().captures(name) {
            let kind = MediaKind::from_prefix(&caps["kind"]);
            let extension = &caps["ext"];
            if kind.is_some_and(|k| k.accepts_extension(extension)) {
                return FileName::Hashed {
                    hash: Hash::from_raw(&caps["hash"]),
                    extension: extension.to_string(),
                };
            }
        }
        FileName::Normal(name.to_string())
    }

    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(&name)
    }

    pub fn is_hashed(&self) -> bool {
        matches!(self, FileName::Hashed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_image_hash_is_recognized() {
        let name = FileName::parse("i_20220401T141648_0a1b2c3d.jpeg");
        match name {
            FileName::Hashed { hash, extension } => {
                assert_eq!(hash.as_str(), "i_20220401T141648_0a1b2c3d");
                assert_eq!(extension, "jpeg");
            }
            other => panic!("expected hashed name, got {:?}", other),
        }
    }

    #[test]
    fn undated_video_hash_is_recognized() {
        assert!(FileName::parse("v_0a1b2c3d.mov").is_hashed());
    }

    #[test]
    fn extension_must_match_kind() {
        assert_eq!(
            FileName::parse("v_0a1b2c3d.jpeg"),
            FileName::Normal("v_0a1b2c3d.jpeg".to_string())
        );
        assert!(!FileName::parse("i_0a1b2c3d.mp4").is_hashed());
    }

    #[test]
    fn camera_names_are_normal() {
        assert!(!FileName::parse("IMG_0001.JPG").is_hashed());
        assert!(!FileName::parse("i_0A1B2C3D.jpeg").is_hashed());
        assert!(!FileName::parse("i_0a1b2c3d_1.jpeg").is_hashed());
    }

    #[test]
    fn from_path_uses_file_name() {
        let path = Path::new("/photos/2022/04/i_0a1b2c3d.png");
        assert!(FileName::from_path(path).is_hashed());
    }
}
