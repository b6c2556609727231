//! Face image classifier adapter.

use std::sync::Arc;
use std::time::Instant;

use emofuse_models::{ClassifierResult, Modality};
use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;

use super::backbone::{EmotionBackbone, ModelInput};
use super::classification_error;
use super::head::OutputHead;
use crate::error::MediaResult;
use crate::face::FaceRegion;
use crate::metrics;

/// Classifies a face region into the image vocabulary.
#[derive(Clone)]
pub struct ImageEmotionClassifier {
    backbone: Arc<dyn EmotionBackbone>,
    head: OutputHead,
    input_size: u32,
}

impl ImageEmotionClassifier {
    pub fn new(backbone: Arc<dyn EmotionBackbone>, head: OutputHead, input_size: u32) -> Self {
        Self {
            backbone,
            head,
            input_size,
        }
    }

    pub fn head(&self) -> &OutputHead {
        &self.head
    }

    /// Classify one face region.
    ///
    /// Every failure, including backbone errors, is reported as an image
    /// classification failure.
    pub fn classify(&self, region: &FaceRegion) -> MediaResult<ClassifierResult> {
        let start = Instant::now();
        let result = self
            .run(region)
            .map_err(|e| classification_error(Modality::Image, e))?;

        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_classification(Modality::Image, elapsed);
        debug!(
            backbone = self.backbone.name(),
            label = %result.label,
            confidence = result.confidence,
            elapsed_ms = elapsed * 1000.0,
            "Image classified"
        );
        Ok(result)
    }

    fn run(&self, region: &FaceRegion) -> MediaResult<ClassifierResult> {
        let input = self.preprocess(&region.pixels)?;
        let scores = self.backbone.forward(&input)?;
        let output = self.head.decode(&scores)?;
        Ok(ClassifierResult::from(output))
    }

    /// Resize to the model input and convert HWC u8 to NCHW `[0, 1]`.
    fn preprocess(&self, pixels: &RgbImage) -> MediaResult<ModelInput> {
        let size = self.input_size;
        let resized;
        let rgb = if pixels.dimensions() == (size, size) {
            pixels
        } else {
            resized = imageops::resize(pixels, size, size, FilterType::Triangle);
            &resized
        };

        let (w, h) = (size as usize, size as usize);
        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = rgb.get_pixel(x as u32, y as u32);
                    chw_data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        ModelInput::new(vec![1, 3, h, w], chw_data)
    }
}
