//! # Perceptual Module
//!
//! Pixel fingerprints for images that have no usable metadata.
//!
//! An image is shrunk to a 32 pixel wide thumbnail (height keeps the aspect
//! ratio) and every pixel is packed as `a<<24 | r<<16 | g<<8 | b`. Two
//! fingerprints are compared channel-blind, position by position, giving a
//! similarity percentage.

mod decode;
mod resize;

pub use decode::ImageDecoder;
pub use resize::ThumbnailResizer;

use crate::error::HashError;
use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Thumbnail width in pixels
pub const THUMBNAIL_WIDTH: u32 = 32;

/// Tallest thumbnail produced, for very narrow strips
pub const MAX_THUMBNAIL_HEIGHT: u32 = THUMBNAIL_WIDTH * THUMBNAIL_WIDTH;

/// Packed ARGB pixels of a thumbnail, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHash(Vec<u32>);

impl ImageHash {
    pub fn new(values: Vec<u32>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Thumbnail dimensions for a source image.
///
/// Height is `round(32 / width * height)` in floating point, clamped to
/// `1..=MAX_THUMBNAIL_HEIGHT`.
pub fn thumbnail_size(width: u32, height: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let scaled = (THUMBNAIL_WIDTH as f64 / width as f64 * height as f64)
        .round()
        .min(MAX_THUMBNAIL_HEIGHT as f64);
    Some((THUMBNAIL_WIDTH, (scaled as u32).max(1)))
}

/// Builds and compares perceptual hashes
pub struct PerceptualHasher;

impl PerceptualHasher {
    pub fn generate(image: &DynamicImage) -> Result<ImageHash, HashError> {
        let (width, height) =
            thumbnail_size(image.width(), image.height()).ok_or_else(|| HashError::EmptyImage {
                path: PathBuf::new(),
            })?;

        let thumbnail = ThumbnailResizer::new().resize_rgba(image, width, height)?;

        let values = thumbnail
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                pack_argb(a, r, g, b)
            })
            .collect();

        Ok(ImageHash(values))
    }

    /// Hash raw ARGB pixels, as produced by platform image APIs
    pub fn from_argb(pixels: &[u32], width: u32, height: u32) -> Result<ImageHash, HashError> {
        if width == 0 || height == 0 || pixels.len() != (width as usize) * (height as usize) {
            return Err(HashError::EmptyImage {
                path: PathBuf::new(),
            });
        }

        let bytes = pixels
            .iter()
            .flat_map(|argb| {
                let [a, r, g, b] = argb.to_be_bytes();
                [r, g, b, a]
            })
            .collect();

        let buffer = image::RgbaImage::from_raw(width, height, bytes).ok_or_else(|| {
            HashError::EmptyImage {
                path: PathBuf::new(),
            }
        })?;

        Self::generate(&DynamicImage::ImageRgba8(buffer))
    }

    /// Decode an image file and hash it
    pub fn hash_file(path: &Path) -> Result<ImageHash, HashError> {
        let image = ImageDecoder::decode(path)?;
        Self::generate(&image).map_err(|e| match e {
            HashError::EmptyImage { .. } => HashError::EmptyImage {
                path: path.to_path_buf(),
            },
            HashError::DecodeError { reason, .. } => HashError::DecodeError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Similarity of two hashes as a percentage in `[0, 100]`.
    ///
    /// Hashes of different lengths share nothing. Each position scores
    /// `min / max` of the two packed values, where two zeros count as equal.
    pub fn compare(first: &ImageHash, second: &ImageHash) -> f64 {
        if first.len() != second.len() {
            return 0.0;
        }
        if first.is_empty() {
            return 100.0;
        }

        let total: f64 = first
            .0
            .iter()
            .zip(&second.0)
            .map(|(&a, &b)| {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                if hi == 0 {
                    1.0
                } else {
                    lo as f64 / hi as f64
                }
            })
            .sum();

        total / first.len() as f64 * 100.0
    }
}

fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb(rgb)))
    }

    #[test]
    fn thumbnail_keeps_aspect_ratio() {
        assert_eq!(thumbnail_size(640, 480), Some((32, 24)));
        assert_eq!(thumbnail_size(480, 640), Some((32, 43)));
        assert_eq!(thumbnail_size(100, 1), Some((32, 1)));
        assert_eq!(thumbnail_size(0, 10), None);
        assert_eq!(thumbnail_size(1, 100_000), Some((32, MAX_THUMBNAIL_HEIGHT)));
        assert_eq!(thumbnail_size(u32::MAX, 1), Some((32, 1)));
    }

    #[test]
    fn solid_image_packs_expected_pixels() {
        let hash = PerceptualHasher::generate(&solid(64, 64, [0x11, 0x22, 0x33])).unwrap();
        assert_eq!(hash.len(), 32 * 32);
        let near = |v: u32, shift: u32, want: u32| ((v >> shift) & 0xFF).abs_diff(want) <= 1;
        assert!(hash
            .values()
            .iter()
            .all(|&v| near(v, 24, 0xFF) && near(v, 16, 0x11) && near(v, 8, 0x22) && near(v, 0, 0x33)));
    }

    #[test]
    fn identical_images_are_fully_similar() {
        let hash = PerceptualHasher::generate(&solid(50, 40, [90, 60, 30])).unwrap();
        assert_eq!(PerceptualHasher::compare(&hash, &hash), 100.0);
    }

    #[test]
    fn compare_stays_in_range() {
        let dark = PerceptualHasher::generate(&solid(32, 32, [0, 0, 0])).unwrap();
        let light = PerceptualHasher::generate(&solid(32, 32, [255, 255, 255])).unwrap();
        let score = PerceptualHasher::compare(&dark, &light);
        assert!((0.0..=100.0).contains(&score));
        assert!(score < 100.0);
    }

    #[test]
    fn different_lengths_share_nothing() {
        let a = ImageHash::new(vec![1, 2, 3]);
        let b = ImageHash::new(vec![1, 2]);
        assert_eq!(PerceptualHasher::compare(&a, &b), 0.0);
    }

    #[test]
    fn zero_handling() {
        let zeros = ImageHash::new(vec![0, 0]);
        assert_eq!(PerceptualHasher::compare(&zeros, &zeros), 100.0);

        let half = ImageHash::new(vec![0, 10]);
        let other = ImageHash::new(vec![5, 10]);
        assert_eq!(PerceptualHasher::compare(&half, &other), 50.0);
    }

    #[test]
    fn empty_hashes_are_equal() {
        let empty = ImageHash::new(Vec::new());
        assert_eq!(PerceptualHasher::compare(&empty, &empty), 100.0);
    }

    #[test]
    fn from_argb_matches_generate() {
        let pixels = vec![0xFF80_4020; 64 * 48];
        let from_argb = PerceptualHasher::from_argb(&pixels, 64, 48).unwrap();
        let generated = PerceptualHasher::generate(&solid(64, 48, [0x80, 0x40, 0x20])).unwrap();
        assert_eq!(from_argb, generated);
    }

    #[test]
    fn from_argb_rejects_wrong_length() {
        assert!(PerceptualHasher::from_argb(&[0; 3], 2, 2).is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = PerceptualHasher::hash_file(Path::new("/nowhere/photo.jpg"));
        assert!(result.is_err());
    }
}
