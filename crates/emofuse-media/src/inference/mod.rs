//! Classifier adapters.
//!
//! A backbone turns a tensor into raw scores; a head turns scores into a
//! [`ModelOutput`](emofuse_models::ModelOutput) of the model variant's shape;
//! the adapters upgrade that to a [`ClassifierResult`](emofuse_models::ClassifierResult).

pub mod audio_classifier;
pub mod backbone;
pub mod head;
pub mod image_classifier;
pub mod ort_backbone;

pub use audio_classifier::AudioEmotionClassifier;
pub use backbone::{EmotionBackbone, ModelInput};
pub use head::{OutputHead, OutputShape};
pub use image_classifier::ImageEmotionClassifier;
pub use ort_backbone::OrtBackbone;

use emofuse_models::Modality;

use crate::error::MediaError;
use crate::metrics;

/// Report any error from a classifier stage as a classification failure of
/// `modality`.
pub(crate) fn classification_error(modality: Modality, err: MediaError) -> MediaError {
    metrics::record_classification_failure(modality);
    match err {
        e @ (MediaError::ClassificationFailed { .. } | MediaError::Timeout(..)) => e,
        other => MediaError::classification_failed(modality, other.to_string()),
    }
}
