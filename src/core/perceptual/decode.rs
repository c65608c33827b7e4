//! Image decoding for thumbnails.
//!
//! JPEG goes through zune-jpeg, HEIC through `sips` on macOS, everything else
//! through the image crate.

use crate::error::HashError;
use image::{DynamicImage, ImageBuffer, Luma, Rgb, Rgba};
use std::fs;
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeRoute {
    Jpeg,
    Heic,
    Generic,
}

impl DecodeRoute {
    fn for_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("jpg" | "jpeg") => Self::Jpeg,
            Some("heic" | "heif") => Self::Heic,
            _ => Self::Generic,
        }
    }
}

/// Picks the fastest decoder available for a file
pub struct ImageDecoder;

impl ImageDecoder {
    pub fn decode(path: &Path) -> Result<DynamicImage, HashError> {
        match DecodeRoute::for_path(path) {
            DecodeRoute::Jpeg => Self::decode_jpeg(path).or_else(|_| Self::decode_generic(path)),
            DecodeRoute::Heic => Self::decode_heic(path).or_else(|_| Self::decode_generic(path)),
            DecodeRoute::Generic => Self::decode_generic(path),
        }
    }

    fn decode_jpeg(path: &Path) -> Result<DynamicImage, HashError> {
        let bytes = fs::read(path).map_err(|e| HashError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
        let mut decoder = JpegDecoder::new_with_options(&bytes, options);

        let pixels = decoder.decode().map_err(|e| HashError::DecodeError {
            path: path.to_path_buf(),
            reason: format!("zune-jpeg: {:?}", e),
        })?;

        let info = decoder.info().ok_or_else(|| HashError::DecodeError {
            path: path.to_path_buf(),
            reason: "missing image info".to_string(),
        })?;
        let (width, height) = (info.width as u32, info.height as u32);

        let buffer_error = || HashError::DecodeError {
            path: path.to_path_buf(),
            reason: "pixel buffer does not match dimensions".to_string(),
        };

        match decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB) {
            ColorSpace::RGB => ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, pixels)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(buffer_error),
            ColorSpace::RGBA => ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, pixels)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(buffer_error),
            ColorSpace::Luma => ImageBuffer::<Luma<u8>, _>::from_raw(width, height, pixels)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(buffer_error),
            _ => Self::decode_generic(path),
        }
    }

    #[cfg(target_os = "macos")]
    fn decode_heic(path: &Path) -> Result<DynamicImage, HashError> {
        use std::process::Command;

        let converted = tempfile::Builder::new()
            .prefix("media_organizer_heic_")
            .suffix(".jpg")
            .tempfile()
            .map_err(|e| HashError::IoError {
                path: path.to_path_buf(),
                source: e,
            })?;

        let output = Command::new("sips")
            .args(["-s", "format", "jpeg"])
            .arg(path)
            .arg("--out")
            .arg(converted.path())
            .output()
            .map_err(|e| HashError::DecodeError {
                path: path.to_path_buf(),
                reason: format!("failed to run sips: {}", e),
            })?;

        if !output.status.success() {
            return Err(HashError::DecodeError {
                path: path.to_path_buf(),
                reason: format!(
                    "sips conversion failed: {}",
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }

        image::open(converted.path()).map_err(|e| HashError::DecodeError {
            path: path.to_path_buf(),
            reason: format!("failed to read converted HEIC: {}", e),
        })
    }

    #[cfg(not(target_os = "macos"))]
    fn decode_heic(path: &Path) -> Result<DynamicImage, HashError> {
        Err(HashError::DecodeError {
            path: path.to_path_buf(),
            reason: "HEIC decoding is only supported on macOS".to_string(),
        })
    }

    fn decode_generic(path: &Path) -> Result<DynamicImage, HashError> {
        image::open(path).map_err(|e| HashError::DecodeError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
