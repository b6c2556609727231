//! Emotion inference core.
//!
//! This crate provides:
//! - Face localization with an ordered fallback chain of detectors
//! - Padded, clamped face cropping at the classifier resolution
//! - WAV decoding, resampling and spectral features for the voice model
//! - ONNX backbones behind a trait, with legacy/rich output heads
//! - Image + audio fusion
//! - [`EmotionEngine`], the shared context wiring all of the above

pub mod audio;
pub mod config;
pub mod error;
pub mod face;
pub mod fusion;
pub mod inference;
pub mod metrics;
pub mod pipeline;

pub use audio::{AudioClip, FeatureConfig, FeatureExtractor};
pub use config::EngineConfig;
pub use error::{MediaError, MediaResult};
pub use face::{FaceDetector, FaceLocalizer, FaceRegion, LocatedFace, RegionCropper, SelectionPolicy};
pub use fusion::{FusionConfig, FusionEngine, ModalityWeights};
pub use inference::{
    AudioEmotionClassifier, EmotionBackbone, ImageEmotionClassifier, ModelInput, OutputHead,
    OutputShape,
};
pub use pipeline::{
    EmotionEngine, EngineInfo, FaceOutcome, ImageAnalysis, ImageOutcome, LocatedRegion,
    MultimodalAnalysis, MultimodalOutcome,
};
