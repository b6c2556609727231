//! Haar cascade face detector, the classical fallback strategy.
//!
//! Runs on grayscale intensities and gives no score, so the largest box wins.

use std::path::Path;

#[cfg(feature = "opencv")]
use std::sync::Mutex;

#[cfg(feature = "opencv")]
use emofuse_models::BoundingBox;
use emofuse_models::FaceCandidate;
use image::RgbImage;
#[cfg(feature = "opencv")]
use opencv::{
    core::{Rect, Size, Vector},
    objdetect::CascadeClassifier,
    prelude::*,
};
#[cfg(feature = "opencv")]
use tracing::{debug, info};

use super::detector::{FaceDetector, SelectionPolicy};
use crate::error::{MediaError, MediaResult};

/// Image pyramid scale step.
pub const SCALE_FACTOR: f64 = 1.1;

/// Overlapping detections required to keep a face.
pub const MIN_NEIGHBORS: i32 = 5;

/// Smallest face side in pixels.
pub const MIN_FACE_SIZE: i32 = 40;

const DETECTOR_NAME: &str = "haar_cascade";

#[cfg(feature = "opencv")]
pub struct HaarCascadeDetector {
    /// `detect_multi_scale` takes `&mut self`
    classifier: Mutex<CascadeClassifier>,
}

#[cfg(feature = "opencv")]
impl HaarCascadeDetector {
    /// Load a cascade XML file.
    pub fn new(cascade_path: &Path) -> MediaResult<Self> {
        if !cascade_path.exists() {
            return Err(MediaError::model_not_found(cascade_path));
        }

        let classifier = CascadeClassifier::new(&cascade_path.to_string_lossy())
            .map_err(|e| MediaError::model_load(format!("Haar cascade load failed: {}", e)))?;

        let empty = classifier
            .empty()
            .map_err(|e| MediaError::model_load(format!("Haar cascade check failed: {}", e)))?;
        if empty {
            return Err(MediaError::model_load(format!(
                "Haar cascade is empty: {}",
                cascade_path.display()
            )));
        }

        info!("Haar cascade loaded: {}", cascade_path.display());
        Ok(Self {
            classifier: Mutex::new(classifier),
        })
    }
}

#[cfg(feature = "opencv")]
impl FaceDetector for HaarCascadeDetector {
    fn detect(&self, image: &RgbImage) -> MediaResult<Vec<FaceCandidate>> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }

        let gray = super::mat::rgb_to_gray_mat(image)?;
        let mut faces = Vector::<Rect>::new();
        {
            let mut classifier = self
                .classifier
                .lock()
                .map_err(|_| MediaError::internal("Haar cascade lock poisoned"))?;
            classifier
                .detect_multi_scale(
                    &gray,
                    &mut faces,
                    SCALE_FACTOR,
                    MIN_NEIGHBORS,
                    0,
                    Size::new(MIN_FACE_SIZE, MIN_FACE_SIZE),
                    Size::new(0, 0),
                )
                .map_err(|e| MediaError::detection_failed(format!("Haar detection failed: {}", e)))?;
        }

        let candidates: Vec<FaceCandidate> = faces
            .iter()
            .map(|r| FaceCandidate::unscored(BoundingBox::new(r.x, r.y, r.width, r.height)))
            .collect();

        debug!("Haar cascade detected {} faces", candidates.len());
        Ok(candidates)
    }

    fn selection(&self) -> SelectionPolicy {
        SelectionPolicy::LargestArea
    }

    fn name(&self) -> &'static str {
        DETECTOR_NAME
    }
}

/// Placeholder when the `opencv` feature is disabled.
#[cfg(not(feature = "opencv"))]
pub struct HaarCascadeDetector;

#[cfg(not(feature = "opencv"))]
impl HaarCascadeDetector {
    pub fn new(_cascade_path: &Path) -> MediaResult<Self> {
        Err(MediaError::FeatureNotEnabled("opencv"))
    }
}

#[cfg(not(feature = "opencv"))]
impl FaceDetector for HaarCascadeDetector {
    fn detect(&self, _image: &RgbImage) -> MediaResult<Vec<FaceCandidate>> {
        Err(MediaError::FeatureNotEnabled("opencv"))
    }

    fn selection(&self) -> SelectionPolicy {
        SelectionPolicy::LargestArea
    }

    fn name(&self) -> &'static str {
        DETECTOR_NAME
    }
}
