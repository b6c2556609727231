//! Voice clip classifier adapter.

use std::sync::Arc;
use std::time::Instant;

use emofuse_models::{ClassifierResult, Modality};
use tracing::debug;

use super::backbone::{EmotionBackbone, ModelInput};
use super::classification_error;
use super::head::OutputHead;
use crate::audio::{resample, AudioClip, FeatureExtractor};
use crate::error::MediaResult;
use crate::metrics;

/// Classifies a waveform into the audio vocabulary.
///
/// Input of any channel count and sample rate is downmixed to mono and
/// resampled to the rate the features were designed for.
#[derive(Clone)]
pub struct AudioEmotionClassifier {
    backbone: Arc<dyn EmotionBackbone>,
    head: OutputHead,
    features: Arc<FeatureExtractor>,
}

impl AudioEmotionClassifier {
    pub fn new(
        backbone: Arc<dyn EmotionBackbone>,
        head: OutputHead,
        features: Arc<FeatureExtractor>,
    ) -> Self {
        Self {
            backbone,
            head,
            features,
        }
    }

    pub fn head(&self) -> &OutputHead {
        &self.head
    }

    /// Sample rate the classifier consumes.
    pub fn target_sample_rate(&self) -> u32 {
        self.features.config().sample_rate
    }

    /// Classify one clip. Every failure is an audio classification failure.
    pub fn classify(&self, clip: &AudioClip) -> MediaResult<ClassifierResult> {
        let start = Instant::now();
        let result = self
            .run(clip)
            .map_err(|e| classification_error(Modality::Audio, e))?;

        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_classification(Modality::Audio, elapsed);
        debug!(
            backbone = self.backbone.name(),
            label = %result.label,
            confidence = result.confidence,
            elapsed_ms = elapsed * 1000.0,
            "Audio classified"
        );
        Ok(result)
    }

    fn run(&self, clip: &AudioClip) -> MediaResult<ClassifierResult> {
        let input = self.preprocess(clip)?;
        let scores = self.backbone.forward(&input)?;
        let output = self.head.decode(&scores)?;
        Ok(ClassifierResult::from(output))
    }

    /// Mono, resampled, `[1, n_mels + n_mfcc, frames]` features.
    fn preprocess(&self, clip: &AudioClip) -> MediaResult<ModelInput> {
        let mono = clip.to_mono();
        let waveform = resample(&mono, clip.sample_rate(), self.target_sample_rate())?;
        let features = self.features.extract(&waveform)?;

        let (rows, frames) = features.dim();
        let data: Vec<f32> = features.iter().copied().collect();
        ModelInput::new(vec![1, rows, frames], data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::head::OutputShape;
    use emofuse_models::CanonicalEmotion;
    use std::sync::Mutex;

    struct FixedBackbone {
        scores: Vec<f32>,
        seen_shape: Mutex<Option<Vec<usize>>>,
    }

    impl FixedBackbone {
        fn new(scores: Vec<f32>) -> Arc<Self> {
            Arc::new(Self {
                scores,
                seen_shape: Mutex::new(None),
            })
        }
    }

    impl EmotionBackbone for FixedBackbone {
        fn forward(&self, input: &ModelInput) -> MediaResult<Vec<f32>> {
            *self.seen_shape.lock().unwrap() = Some(input.shape.clone());
            Ok(self.scores.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn audio_labels() -> Vec<String> {
        CanonicalEmotion::ALL
            .iter()
            .map(|e| e.as_str().to_string())
            .collect()
    }

    fn classifier(backbone: Arc<FixedBackbone>, shape: OutputShape) -> AudioEmotionClassifier {
        AudioEmotionClassifier::new(
            backbone,
            OutputHead::new(Modality::Audio, audio_labels(), shape),
            Arc::new(FeatureExtractor::default()),
        )
    }

    #[test]
    fn test_stereo_44k_is_downmixed_and_resampled() {
        let backbone = FixedBackbone::new(vec![0.0, 0.0, 0.0, 0.0, 0.0, 3.0, 0.0]);
        let classifier = classifier(backbone.clone(), OutputShape::Rich);

        // One second of stereo noise-free audio at 44.1 kHz
        let clip = AudioClip::new(vec![0.1; 2 * 44_100], 2, 44_100).unwrap();
        let result = classifier.classify(&clip).unwrap();

        assert_eq!(result.label, "sadness");
        assert_eq!(result.distribution.len(), 7);
        assert_eq!(
            backbone.seen_shape.lock().unwrap().clone(),
            Some(vec![1, 104, 81])
        );
    }

    #[test]
    fn test_legacy_audio_model() {
        let backbone = FixedBackbone::new(vec![9.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let classifier = classifier(backbone, OutputShape::Legacy);

        let clip = AudioClip::mono(vec![0.0; 16_000], 16_000).unwrap();
        let result = classifier.classify(&clip).unwrap();
        assert_eq!(result, ClassifierResult::legacy("anger"));
    }

    #[test]
    fn test_too_short_clip_is_classification_failure() {
        let classifier = classifier(FixedBackbone::new(vec![0.0; 7]), OutputShape::Rich);
        let clip = AudioClip::mono(vec![0.0; 100], 16_000).unwrap();

        let err = classifier.classify(&clip).unwrap_err();
        assert!(err.is_classification_failure());
    }

    #[test]
    fn test_wrong_score_count_is_classification_failure() {
        let classifier = classifier(FixedBackbone::new(vec![0.0; 3]), OutputShape::Rich);
        let clip = AudioClip::mono(vec![0.0; 16_000], 16_000).unwrap();

        let err = classifier.classify(&clip).unwrap_err();
        assert!(err.to_string().starts_with("audio classification failed"));
    }
}
