//! Error types for emotion inference.
//!
//! "No face" is not an error: it is reported as
//! [`crate::pipeline::FaceOutcome::NoFace`]. Detector failures are absorbed by
//! the localizer and never reach callers; classification failures always do.

use std::path::PathBuf;

use emofuse_models::Modality;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during emotion inference.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    #[error("Face detection failed: {0}")]
    DetectionFailed(String),

    #[error("{modality} classification failed: {message}")]
    ClassificationFailed { modality: Modality, message: String },

    #[error("Model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("{0} timed out after {1} ms")]
    Timeout(Modality, u64),

    #[error("Feature not enabled: {0}")]
    FeatureNotEnabled(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create a classification failure for one modality.
    pub fn classification_failed(modality: Modality, message: impl Into<String>) -> Self {
        Self::ClassificationFailed {
            modality,
            message: message.into(),
        }
    }

    /// Create an invalid image error.
    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage(message.into())
    }

    /// Create an invalid audio error.
    pub fn invalid_audio(message: impl Into<String>) -> Self {
        Self::InvalidAudio(message.into())
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Create a model load error.
    pub fn model_load(message: impl Into<String>) -> Self {
        Self::ModelLoad(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True when the error is a classifier failing on its input.
    ///
    /// Timeouts count: a modality that never answered failed to classify.
    pub fn is_classification_failure(&self) -> bool {
        matches!(self, Self::ClassificationFailed { .. } | Self::Timeout(..))
    }

    /// True when the caller sent bytes that could not be decoded.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidImage(_) | Self::InvalidAudio(_))
    }
}
