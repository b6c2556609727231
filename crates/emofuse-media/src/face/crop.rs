//! Padded, clamped and resized face regions.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use emofuse_models::BoundingBox;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use tracing::debug;

use crate::config::{DEFAULT_FACE_PADDING, DEFAULT_FACE_SIZE};
use crate::error::{MediaError, MediaResult};

/// A canonical face crop ready for the image classifier.
///
/// Always `target_size x target_size` RGB8 and never empty.
#[derive(Debug, Clone)]
pub struct FaceRegion {
    pub pixels: RgbImage,
    /// Detected face box in source image coordinates
    pub face_box: BoundingBox,
    /// Padded and clamped box that was cut out of the source image
    pub crop_box: BoundingBox,
}

impl FaceRegion {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Encode the crop as a base64 PNG for display.
    pub fn to_png_base64(&self) -> MediaResult<String> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(self.pixels.clone())
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .map_err(|e| MediaError::internal(format!("PNG encoding failed: {}", e)))?;
        Ok(STANDARD.encode(buf))
    }
}

/// Turns a face box into a [`FaceRegion`].
#[derive(Debug, Clone, Copy)]
pub struct RegionCropper {
    /// Padding on each side as a fraction of the longer box side
    pub padding_fraction: f64,
    /// Side of the square output
    pub target_size: u32,
}

impl Default for RegionCropper {
    fn default() -> Self {
        Self {
            padding_fraction: DEFAULT_FACE_PADDING,
            target_size: DEFAULT_FACE_SIZE,
        }
    }
}

impl RegionCropper {
    pub fn new(padding_fraction: f64, target_size: u32) -> Self {
        Self {
            padding_fraction,
            target_size,
        }
    }

    /// Pixels added on each side of `bbox`.
    pub fn padding_for(&self, bbox: &BoundingBox) -> i32 {
        let longer = bbox.width.max(bbox.height).max(0) as f64;
        (self.padding_fraction * longer).round() as i32
    }

    /// Box grown by the padding, before clamping.
    pub fn expand(&self, bbox: &BoundingBox) -> BoundingBox {
        bbox.pad(self.padding_for(bbox))
    }

    /// Cut the padded face out of `image` and resize it.
    ///
    /// Returns `None` for a degenerate crop, which callers treat like no face.
    pub fn crop(&self, image: &RgbImage, bbox: &BoundingBox) -> Option<FaceRegion> {
        if bbox.is_empty() || self.target_size == 0 {
            return None;
        }

        let (width, height) = image.dimensions();
        let Some(crop_box) = self.expand(bbox).clamp(width, height) else {
            debug!(?bbox, width, height, "Degenerate face crop");
            return None;
        };

        let patch = imageops::crop_imm(
            image,
            crop_box.x as u32,
            crop_box.y as u32,
            crop_box.width as u32,
            crop_box.height as u32,
        )
        .to_image();
        let pixels = imageops::resize(
            &patch,
            self.target_size,
            self.target_size,
            FilterType::Triangle,
        );

        Some(FaceRegion {
            pixels,
            face_box: *bbox,
            crop_box,
        })
    }
}
