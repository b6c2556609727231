//! Engine configuration.

use std::path::PathBuf;

use emofuse_models::CanonicalEmotion;
use tracing::warn;

use crate::inference::OutputShape;

/// Native vocabulary of the image classifier, in model output order.
pub const IMAGE_CLASSES: &[&str] = &["happy", "sad", "angry", "neutral", "surprise", "fear", "disgust"];

/// Default padding around a detected face, as a fraction of its longer side.
pub const DEFAULT_FACE_PADDING: f64 = 0.2;

/// Canonical face region resolution.
pub const DEFAULT_FACE_SIZE: u32 = 224;

/// Sample rate the audio classifier was trained on.
pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 16_000;

/// Configuration for building an [`crate::EmotionEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// ONNX export of the image classifier
    pub image_model_path: PathBuf,
    /// ONNX export of the audio classifier
    pub audio_model_path: PathBuf,
    /// Image classifier vocabulary in output order
    pub image_labels: Vec<String>,
    /// Audio classifier vocabulary in output order
    pub audio_labels: Vec<String>,
    /// Return shape of the image model head
    pub image_output: OutputShape,
    /// Return shape of the audio model head
    pub audio_output: OutputShape,
    /// Run the learned detector before the cascade
    pub use_primary_detector: bool,
    /// Explicit YuNet model path (otherwise the default search paths are used)
    pub yunet_model_path: Option<PathBuf>,
    /// Haar cascade XML
    pub haar_cascade_path: PathBuf,
    /// Face padding as a fraction of the longer side
    pub face_padding: f64,
    /// Side of the square face region
    pub face_size: u32,
    /// Sample rate expected by the audio classifier
    pub audio_sample_rate: u32,
    /// Intra-op threads per ONNX session
    pub inference_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            image_model_path: PathBuf::from("models/emotion/resnet18_emotion.onnx"),
            audio_model_path: PathBuf::from("models/emotion/emotion_crnn.onnx"),
            image_labels: IMAGE_CLASSES.iter().map(|s| s.to_string()).collect(),
            audio_labels: CanonicalEmotion::ALL.iter().map(|e| e.as_str().to_string()).collect(),
            image_output: OutputShape::Rich,
            audio_output: OutputShape::Rich,
            use_primary_detector: true,
            yunet_model_path: None,
            haar_cascade_path: PathBuf::from(
                "models/face_detection/haarcascade_frontalface_default.xml",
            ),
            face_padding: DEFAULT_FACE_PADDING,
            face_size: DEFAULT_FACE_SIZE,
            audio_sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
            inference_threads: 1,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            image_model_path: std::env::var("IMAGE_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.image_model_path),
            audio_model_path: std::env::var("AUDIO_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.audio_model_path),
            image_labels: std::env::var("IMAGE_LABELS")
                .map(|s| parse_list(&s))
                .unwrap_or(defaults.image_labels),
            audio_labels: std::env::var("AUDIO_LABELS")
                .map(|s| parse_list(&s))
                .unwrap_or(defaults.audio_labels),
            image_output: env_output_shape("IMAGE_OUTPUT_SHAPE", defaults.image_output),
            audio_output: env_output_shape("AUDIO_OUTPUT_SHAPE", defaults.audio_output),
            use_primary_detector: std::env::var("USE_PRIMARY_DETECTOR")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.use_primary_detector),
            yunet_model_path: std::env::var("YUNET_MODEL_PATH").ok().map(PathBuf::from),
            haar_cascade_path: std::env::var("HAAR_CASCADE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.haar_cascade_path),
            face_padding: std::env::var("FACE_PADDING")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|p: &f64| p.is_finite() && *p >= 0.0)
                .unwrap_or(defaults.face_padding),
            face_size: std::env::var("FACE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s: &u32| *s > 0)
                .unwrap_or(defaults.face_size),
            audio_sample_rate: std::env::var("AUDIO_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|r: &u32| *r > 0)
                .unwrap_or(defaults.audio_sample_rate),
            inference_threads: std::env::var("INFERENCE_THREADS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.inference_threads),
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_output_shape(key: &str, default: OutputShape) -> OutputShape {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring {}={:?}: expected 'rich' or 'legacy'", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.face_size, 224);
        assert!((config.face_padding - 0.2).abs() < 1e-9);
        assert_eq!(config.audio_sample_rate, 16_000);
        assert_eq!(config.image_labels.len(), 7);
        assert_eq!(config.audio_labels[0], "anger");
        assert!(config.use_primary_detector);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" a, b ,,c"), vec!["a", "b", "c"]);
    }
}
