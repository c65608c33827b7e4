//! SIMD thumbnail resizing via fast_image_resize.

use crate::error::HashError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, RgbaImage};
use std::path::PathBuf;

/// Reusable RGBA resizer
pub struct ThumbnailResizer {
    resizer: Resizer,
}

impl ThumbnailResizer {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Resize to exactly `width` x `height` RGBA pixels
    pub fn resize_rgba(
        &mut self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, HashError> {
        let rgba = image.to_rgba8();
        let (src_width, src_height) = rgba.dimensions();

        if src_width == 0 || src_height == 0 || width == 0 || height == 0 {
            return Err(HashError::EmptyImage {
                path: PathBuf::new(),
            });
        }

        let src = Image::from_vec_u8(src_width, src_height, rgba.into_raw(), PixelType::U8x4)
            .map_err(|e| HashError::DecodeError {
                path: PathBuf::new(),
                reason: format!("invalid source buffer: {}", e),
            })?;
        let mut dst = Image::new(width, height, PixelType::U8x4);

        // Alpha is part of the hash, so pixels must not be premultiplied
        let options = ResizeOptions::new()
            .resize_alg(ResizeAlg::Convolution(FilterType::Bilinear))
            .use_alpha(false);

        self.resizer
            .resize(&src, &mut dst, &options)
            .map_err(|e| HashError::DecodeError {
                path: PathBuf::new(),
                reason: format!("resize failed: {}", e),
            })?;

        RgbaImage::from_raw(width, height, dst.into_vec()).ok_or_else(|| HashError::DecodeError {
            path: PathBuf::new(),
            reason: "resized buffer does not match dimensions".to_string(),
        })
    }
}

impl Default for ThumbnailResizer {
    fn default() -> Self {
        Self::new()
    }
}
