//! Request pipeline: the engine context shared by every request.
//!
//! ```text
//! image bytes -> decode -> localize -> crop -> image classifier --\
//!                                                                  +-> fuse
//! audio bytes -> decode -> mono/resample/features -> audio clf ---/
//! ```
//!
//! The two modality pipelines are independent and run concurrently on the
//! blocking pool; fusion waits for both. "No face" short-circuits the image
//! side, and the first failure on either side is returned immediately.

use std::sync::Arc;
use std::time::Duration;

use emofuse_models::{ClassifierResult, FusionResult, Modality};
use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audio::{decode_wav, AudioClip, FeatureConfig, FeatureExtractor};
use crate::config::EngineConfig;
use crate::error::{MediaError, MediaResult};
use crate::face::{
    FaceDetector, FaceLocalizer, FaceRegion, HaarCascadeDetector, LocatedFace, RegionCropper,
    YuNetDetector,
};
use crate::fusion::FusionEngine;
use crate::inference::{
    AudioEmotionClassifier, ImageEmotionClassifier, OrtBackbone, OutputHead,
};
use crate::metrics;

/// A located face and its canonical crop.
#[derive(Debug, Clone)]
pub struct LocatedRegion {
    pub face: LocatedFace,
    pub region: FaceRegion,
}

/// Result of face localization. `NoFace` is an expected outcome, not an error.
#[derive(Debug, Clone)]
pub enum FaceOutcome {
    Found(LocatedRegion),
    NoFace,
}

impl FaceOutcome {
    pub fn is_no_face(&self) -> bool {
        matches!(self, FaceOutcome::NoFace)
    }
}

/// Image-only analysis.
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    pub located: LocatedRegion,
    pub result: ClassifierResult,
}

#[derive(Debug, Clone)]
pub enum ImageOutcome {
    Classified(ImageAnalysis),
    NoFace,
}

/// Image + audio analysis with the fused decision.
#[derive(Debug, Clone)]
pub struct MultimodalAnalysis {
    pub located: LocatedRegion,
    pub image: ClassifierResult,
    pub audio: ClassifierResult,
    pub fusion: FusionResult,
}

#[derive(Debug, Clone)]
pub enum MultimodalOutcome {
    Fused(Box<MultimodalAnalysis>),
    NoFace,
}

/// Summary of the loaded engine, for readiness reporting.
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub detectors: Vec<&'static str>,
    pub image_labels: Vec<String>,
    pub audio_labels: Vec<String>,
    pub audio_sample_rate: u32,
}

/// Loaded detectors and classifiers.
///
/// Built once at startup and shared read-only (behind `Arc`) by all requests.
#[derive(Clone)]
pub struct EmotionEngine {
    localizer: FaceLocalizer,
    cropper: RegionCropper,
    image_classifier: ImageEmotionClassifier,
    audio_classifier: AudioEmotionClassifier,
    fusion: FusionEngine,
}

impl EmotionEngine {
    /// Assemble an engine from already-built parts.
    pub fn new(
        localizer: FaceLocalizer,
        cropper: RegionCropper,
        image_classifier: ImageEmotionClassifier,
        audio_classifier: AudioEmotionClassifier,
        fusion: FusionEngine,
    ) -> Self {
        Self {
            localizer,
            cropper,
            image_classifier,
            audio_classifier,
            fusion,
        }
    }

    /// Load detectors and models described by `config`.
    ///
    /// Missing classifier models are fatal. Missing detectors only shrink the
    /// fallback chain.
    pub fn from_config(config: &EngineConfig) -> MediaResult<Self> {
        let mut strategies: Vec<Arc<dyn FaceDetector>> = Vec::new();

        if config.use_primary_detector {
            match YuNetDetector::new(config.yunet_model_path.as_deref()) {
                Ok(detector) => strategies.push(Arc::new(detector)),
                Err(e) => warn!("Primary face detector unavailable: {}", e),
            }
        } else {
            info!("Primary face detector disabled by configuration");
        }

        match HaarCascadeDetector::new(&config.haar_cascade_path) {
            Ok(detector) => strategies.push(Arc::new(detector)),
            Err(e) => warn!("Haar cascade unavailable: {}", e),
        }

        if strategies.is_empty() {
            warn!("No face detectors available, every image will report no face");
        }

        let image_backbone = OrtBackbone::load(&config.image_model_path, config.inference_threads)?;
        let audio_backbone = OrtBackbone::load(&config.audio_model_path, config.inference_threads)?;

        let image_classifier = ImageEmotionClassifier::new(
            Arc::new(image_backbone),
            OutputHead::new(Modality::Image, config.image_labels.clone(), config.image_output),
            config.face_size,
        );

        let features = FeatureExtractor::new(FeatureConfig {
            sample_rate: config.audio_sample_rate,
            ..FeatureConfig::default()
        });
        let audio_classifier = AudioEmotionClassifier::new(
            Arc::new(audio_backbone),
            OutputHead::new(Modality::Audio, config.audio_labels.clone(), config.audio_output),
            Arc::new(features),
        );

        let engine = Self::new(
            FaceLocalizer::new(strategies),
            RegionCropper::new(config.face_padding, config.face_size),
            image_classifier,
            audio_classifier,
            FusionEngine::default(),
        );

        info!(
            detectors = ?engine.localizer.strategy_names(),
            image_output = %config.image_output,
            audio_output = %config.audio_output,
            "Emotion engine ready"
        );
        Ok(engine)
    }

    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            detectors: self.localizer.strategy_names(),
            image_labels: self.image_classifier.head().labels().to_vec(),
            audio_labels: self.audio_classifier.head().labels().to_vec(),
            audio_sample_rate: self.audio_classifier.target_sample_rate(),
        }
    }

    pub fn has_face_detectors(&self) -> bool {
        !self.localizer.is_empty()
    }

    /// Decode uploaded image bytes into RGB8.
    pub fn decode_image(bytes: &[u8]) -> MediaResult<RgbImage> {
        if bytes.is_empty() {
            return Err(MediaError::invalid_image("Empty upload"));
        }
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| MediaError::invalid_image(e.to_string()))?;
        Ok(decoded.to_rgb8())
    }

    /// Decode uploaded WAV bytes.
    pub fn decode_audio(bytes: &[u8]) -> MediaResult<AudioClip> {
        decode_wav(bytes)
    }

    /// Find and crop the primary face of an already decoded image.
    pub fn locate_and_crop(&self, image: &RgbImage) -> FaceOutcome {
        let Some(face) = self.localizer.locate(image) else {
            metrics::record_no_face();
            return FaceOutcome::NoFace;
        };

        match self.cropper.crop(image, &face.bbox) {
            Some(region) => FaceOutcome::Found(LocatedRegion { face, region }),
            None => {
                metrics::record_no_face();
                FaceOutcome::NoFace
            }
        }
    }

    /// Decode image bytes, then find and crop the primary face.
    pub fn locate_and_crop_face(&self, image_bytes: &[u8]) -> MediaResult<FaceOutcome> {
        let image = Self::decode_image(image_bytes)?;
        Ok(self.locate_and_crop(&image))
    }

    pub fn classify_image(&self, region: &FaceRegion) -> MediaResult<ClassifierResult> {
        self.image_classifier.classify(region)
    }

    pub fn classify_audio(&self, clip: &AudioClip) -> MediaResult<ClassifierResult> {
        self.audio_classifier.classify(clip)
    }

    pub fn fuse(&self, image: &ClassifierResult, audio: &ClassifierResult) -> FusionResult {
        self.fusion.fuse(image, audio)
    }

    /// Image pipeline: decode, localize, crop, classify.
    pub fn analyze_image(&self, image_bytes: &[u8]) -> MediaResult<ImageOutcome> {
        match self.locate_and_crop_face(image_bytes)? {
            FaceOutcome::NoFace => {
                debug!("No face in image");
                Ok(ImageOutcome::NoFace)
            }
            FaceOutcome::Found(located) => {
                let result = self.classify_image(&located.region)?;
                Ok(ImageOutcome::Classified(ImageAnalysis { located, result }))
            }
        }
    }

    /// Audio pipeline: decode, classify.
    pub fn analyze_audio(&self, audio_bytes: &[u8]) -> MediaResult<ClassifierResult> {
        let clip = Self::decode_audio(audio_bytes)?;
        self.classify_audio(&clip)
    }

    /// [`analyze_image`](Self::analyze_image) on the blocking pool, bounded
    /// by `deadline`.
    pub async fn analyze_image_async(
        self: &Arc<Self>,
        image_bytes: Vec<u8>,
        deadline: Option<Duration>,
    ) -> MediaResult<ImageOutcome> {
        let engine = Arc::clone(self);
        run_blocking(Modality::Image, deadline, move || {
            engine.analyze_image(&image_bytes)
        })
        .await
    }

    /// [`analyze_audio`](Self::analyze_audio) on the blocking pool, bounded
    /// by `deadline`.
    pub async fn analyze_audio_async(
        self: &Arc<Self>,
        audio_bytes: Vec<u8>,
        deadline: Option<Duration>,
    ) -> MediaResult<ClassifierResult> {
        let engine = Arc::clone(self);
        run_blocking(Modality::Audio, deadline, move || {
            engine.analyze_audio(&audio_bytes)
        })
        .await
    }

    /// Run both modalities concurrently and fuse.
    ///
    /// Each modality gets its own `deadline`; a modality that misses it is a
    /// classification failure. The first failure on either side is returned
    /// without waiting for the other. "No face" is not a failure, so it only
    /// wins once the audio side has also succeeded.
    pub async fn analyze_multimodal(
        self: &Arc<Self>,
        image_bytes: Vec<u8>,
        audio_bytes: Vec<u8>,
        deadline: Option<Duration>,
    ) -> MediaResult<MultimodalOutcome> {
        let (image, audio) = tokio::try_join!(
            self.analyze_image_async(image_bytes, deadline),
            self.analyze_audio_async(audio_bytes, deadline),
        )?;

        let ImageOutcome::Classified(ImageAnalysis {
            located,
            result: image,
        }) = image
        else {
            return Ok(MultimodalOutcome::NoFace);
        };

        let fusion = self.fuse(&image, &audio);
        Ok(MultimodalOutcome::Fused(Box::new(MultimodalAnalysis {
            located,
            image,
            audio,
            fusion,
        })))
    }
}

/// Run a modality stage on the blocking pool with an optional deadline.
async fn run_blocking<T, F>(modality: Modality, deadline: Option<Duration>, task: F) -> MediaResult<T>
where
    F: FnOnce() -> MediaResult<T> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(task);

    let joined = match deadline {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(%modality, limit_ms = limit.as_millis() as u64, "Modality timed out");
                metrics::record_classification_failure(modality);
                return Err(MediaError::Timeout(modality, limit.as_millis() as u64));
            }
        },
        None => handle.await,
    };

    joined.map_err(|e| MediaError::internal(format!("{} task failed: {}", modality, e)))?
}
