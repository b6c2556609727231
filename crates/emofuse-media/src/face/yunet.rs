//! OpenCV YuNet face detector, the primary (learned) strategy.
//!
//! YuNet is a lightweight CNN detector exposed through OpenCV's
//! `FaceDetectorYN`. It scores every face, so candidates are ranked by
//! confidence first and area second.
//!
//! # Known Issues
//! - OpenCV 4.6.0 can fail with "Layer with requested id=-1 not found" on
//!   2023mar models. Such errors surface as detection failures and the
//!   localizer falls back to the cascade.

use std::path::{Path, PathBuf};

#[cfg(feature = "opencv")]
use std::sync::Mutex;

use emofuse_models::FaceCandidate;
#[cfg(feature = "opencv")]
use emofuse_models::BoundingBox;
use image::RgbImage;
#[cfg(feature = "opencv")]
use opencv::{core::Ptr, objdetect::FaceDetectorYN, prelude::*};
#[cfg(feature = "opencv")]
use tracing::{debug, info, warn};

use super::detector::{FaceDetector, SelectionPolicy};
use crate::error::{MediaError, MediaResult};

/// Model search paths, preferred first.
///
/// 2023mar models need OpenCV 4.8+; the 2022mar model works with 4.5+.
pub const YUNET_MODEL_PATHS: &[&str] = &[
    "models/face_detection/yunet/face_detection_yunet_2023mar.onnx",
    "models/face_detection/yunet/face_detection_yunet_2023mar_int8bq.onnx",
    "/app/models/face_detection/yunet/face_detection_yunet_2023mar.onnx",
    "/app/models/face_detection/yunet/face_detection_yunet_2023mar_int8bq.onnx",
    "/usr/share/opencv/models/face_detection_yunet_2023mar.onnx",
    "models/face_detection/yunet/face_detection_yunet_2022mar.onnx",
    "/app/models/face_detection/yunet/face_detection_yunet_2022mar.onnx",
    "/usr/share/opencv/models/face_detection_yunet_2022mar.onnx",
];

/// Minimum detector score; lower-scored faces are dropped by OpenCV.
pub const SCORE_THRESHOLD: f32 = 0.3;

/// Non-maximum suppression IoU threshold.
pub const NMS_THRESHOLD: f32 = 0.3;

/// Maximum faces returned per image.
pub const TOP_K: i32 = 10;

const DETECTOR_NAME: &str = "yunet";

/// Resolve the model file: the explicit path when given, else the first
/// existing search path.
pub fn find_model_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    YUNET_MODEL_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// Network input size for an image.
///
/// Large images are scaled down to fit 960x540, sides are aligned to
/// multiples of 32 and clamped to `160..=960` x `120..=540`.
pub fn detector_input_size(width: u32, height: u32) -> (i32, i32) {
    const TARGET_WIDTH: f64 = 960.0;
    const TARGET_HEIGHT: f64 = 540.0;
    const ALIGNMENT: i32 = 32;

    let scale = (width as f64 / TARGET_WIDTH)
        .max(height as f64 / TARGET_HEIGHT)
        .max(1.0);

    let mut input_width = (width as f64 / scale).round() as i32;
    let mut input_height = (height as f64 / scale).round() as i32;

    input_width = ((input_width + ALIGNMENT / 2) / ALIGNMENT) * ALIGNMENT;
    input_height = ((input_height + ALIGNMENT / 2) / ALIGNMENT) * ALIGNMENT;

    (input_width.clamp(160, 960), input_height.clamp(120, 540))
}

/// YuNet face detector.
#[cfg(feature = "opencv")]
pub struct YuNetDetector {
    /// `FaceDetectorYN` mutates its input size per call
    detector: Mutex<Ptr<FaceDetectorYN>>,
    model_path: PathBuf,
}

#[cfg(feature = "opencv")]
impl YuNetDetector {
    /// Load YuNet from `explicit` or the default search paths.
    pub fn new(explicit: Option<&Path>) -> MediaResult<Self> {
        let model_path = find_model_path(explicit).ok_or_else(|| {
            MediaError::model_not_found(
                explicit
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(YUNET_MODEL_PATHS[0])),
            )
        })?;
        Self::with_model(&model_path)
    }

    /// Load YuNet from a specific model file.
    pub fn with_model(model_path: &Path) -> MediaResult<Self> {
        let metadata = std::fs::metadata(model_path)
            .map_err(|_| MediaError::model_not_found(model_path))?;
        if metadata.len() < 50_000 {
            return Err(MediaError::model_load(format!(
                "YuNet model file appears corrupted (size: {} bytes)",
                metadata.len()
            )));
        }

        let path_str = model_path.to_string_lossy();
        let (input_width, input_height) = detector_input_size(640, 480);
        let detector = Self::create_detector_with_fallback(&path_str, input_width, input_height)?;

        info!("YuNet detector initialized: model={}", model_path.display());

        Ok(Self {
            detector: Mutex::new(detector),
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Try the default DNN backend first, then plain OpenCV.
    fn create_detector_with_fallback(
        model_path: &str,
        input_width: i32,
        input_height: i32,
    ) -> MediaResult<Ptr<FaceDetectorYN>> {
        use opencv::dnn::{DNN_BACKEND_DEFAULT, DNN_BACKEND_OPENCV, DNN_TARGET_CPU};

        let backends = [
            (DNN_BACKEND_DEFAULT, DNN_TARGET_CPU, "default"),
            (DNN_BACKEND_OPENCV, DNN_TARGET_CPU, "opencv"),
        ];

        let mut last_error = String::new();
        for (backend_id, target_id, backend_name) in backends {
            match FaceDetectorYN::create(
                model_path,
                "",
                opencv::core::Size::new(input_width, input_height),
                SCORE_THRESHOLD,
                NMS_THRESHOLD,
                TOP_K,
                backend_id,
                target_id,
            ) {
                Ok(detector) => {
                    debug!("YuNet created with {} backend", backend_name);
                    return Ok(detector);
                }
                Err(e) => {
                    warn!("YuNet {} backend failed: {}", backend_name, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(MediaError::model_load(format!(
            "Failed to create YuNet detector with any backend: {}",
            last_error
        )))
    }

    /// Parse rows of `[x, y, w, h, 5 landmark pairs, score]` back to image
    /// coordinates.
    fn parse_detection_results(
        faces: &opencv::core::Mat,
        scale_x: f64,
        scale_y: f64,
    ) -> Vec<FaceCandidate> {
        let num_faces = faces.rows();
        if num_faces <= 0 {
            return Vec::new();
        }
        if faces.cols() < 15 {
            warn!(
                "YuNet output has unexpected format: {} columns (expected 15)",
                faces.cols()
            );
            return Vec::new();
        }

        let value = |row: i32, col: i32| faces.at_2d::<f32>(row, col).ok().map(|v| *v as f64);

        (0..num_faces)
            .filter_map(|i| {
                let x = value(i, 0)? * scale_x;
                let y = value(i, 1)? * scale_y;
                let w = value(i, 2)? * scale_x;
                let h = value(i, 3)? * scale_y;
                let score = value(i, 14)?;

                if ![x, y, w, h, score].iter().all(|v| v.is_finite()) {
                    return None;
                }
                if w <= 0.0 || h <= 0.0 || score < SCORE_THRESHOLD as f64 {
                    return None;
                }

                let bbox = BoundingBox::new(
                    x.round() as i32,
                    y.round() as i32,
                    w.round() as i32,
                    h.round() as i32,
                );
                Some(FaceCandidate::scored(bbox, score))
            })
            .collect()
    }
}

#[cfg(feature = "opencv")]
impl FaceDetector for YuNetDetector {
    fn detect(&self, image: &RgbImage) -> MediaResult<Vec<FaceCandidate>> {
        use opencv::core::{Mat, Size};
        use opencv::imgproc;

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let frame = super::mat::rgb_to_bgr_mat(image)?;
        let (input_width, input_height) = detector_input_size(width, height);
        let input_size = Size::new(input_width, input_height);

        let mut resized = Mat::default();
        imgproc::resize(&frame, &mut resized, input_size, 0.0, 0.0, imgproc::INTER_LINEAR)
            .map_err(|e| MediaError::detection_failed(format!("YuNet resize failed: {}", e)))?;

        let mut faces = Mat::default();
        {
            let mut detector = self
                .detector
                .lock()
                .map_err(|_| MediaError::internal("YuNet detector lock poisoned"))?;
            if let Err(e) = detector.set_input_size(input_size) {
                debug!("Failed to set YuNet input size (may be OK): {}", e);
            }
            detector
                .detect(&resized, &mut faces)
                .map_err(|e| MediaError::detection_failed(format!("YuNet detection failed: {}", e)))?;
        }

        let scale_x = width as f64 / input_width as f64;
        let scale_y = height as f64 / input_height as f64;
        let candidates = Self::parse_detection_results(&faces, scale_x, scale_y);

        debug!(
            "YuNet detected {} faces (input {}x{})",
            candidates.len(),
            input_width,
            input_height
        );
        Ok(candidates)
    }

    fn selection(&self) -> SelectionPolicy {
        SelectionPolicy::ConfidenceThenArea
    }

    fn name(&self) -> &'static str {
        DETECTOR_NAME
    }
}

/// Placeholder when the `opencv` feature is disabled.
#[cfg(not(feature = "opencv"))]
pub struct YuNetDetector;

#[cfg(not(feature = "opencv"))]
impl YuNetDetector {
    pub fn new(_explicit: Option<&Path>) -> MediaResult<Self> {
        Err(MediaError::FeatureNotEnabled("opencv"))
    }

    pub fn with_model(_model_path: &Path) -> MediaResult<Self> {
        Err(MediaError::FeatureNotEnabled("opencv"))
    }
}

#[cfg(not(feature = "opencv"))]
impl FaceDetector for YuNetDetector {
    fn detect(&self, _image: &RgbImage) -> MediaResult<Vec<FaceCandidate>> {
        Err(MediaError::FeatureNotEnabled("opencv"))
    }

    fn selection(&self) -> SelectionPolicy {
        SelectionPolicy::ConfidenceThenArea
    }

    fn name(&self) -> &'static str {
        DETECTOR_NAME
    }
}
