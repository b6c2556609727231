//! Multimodal fusion of image and audio classifier results.
//!
//! # Policy
//!
//! Both top labels are reconciled onto the canonical taxonomy first.
//! - **Agreement**: the shared label wins with confidence
//!   `min(cap, (image + audio) / 2)`.
//! - **Disagreement**: audio is authoritative; its label wins with its own
//!   confidence scaled by a fixed penalty.
//!
//! A per-class blend of both distributions is attached for auditing. It never
//! picks the label.

use emofuse_models::{
    CanonicalDistribution, CanonicalEmotion, ClassifierResult, EmotionLabel, FusionMethod,
    FusionResult, Modality,
};
use tracing::{debug, warn};

use crate::metrics;

/// Blend weights for one fusion case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModalityWeights {
    pub image: f64,
    pub audio: f64,
}

impl ModalityWeights {
    pub fn total(&self) -> f64 {
        self.image + self.audio
    }
}

/// Fusion tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionConfig {
    /// Blend used when both channels agree
    pub agreement_weights: ModalityWeights,
    /// Blend used when audio overrides the image
    pub disagreement_weights: ModalityWeights,
    /// Upper bound on the agreement confidence
    pub agreement_confidence_cap: f64,
    /// Multiplier applied to the audio confidence on disagreement
    pub disagreement_penalty: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            agreement_weights: ModalityWeights {
                image: 0.4,
                audio: 0.6,
            },
            disagreement_weights: ModalityWeights {
                image: 0.15,
                audio: 0.85,
            },
            agreement_confidence_cap: 0.95,
            disagreement_penalty: 0.9,
        }
    }
}

/// Deterministic, side-effect free fusion of two classifier results.
#[derive(Debug, Clone, Copy, Default)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse an image result with an audio result.
    pub fn fuse(&self, image: &ClassifierResult, audio: &ClassifierResult) -> FusionResult {
        let image_emotion = reconcile_label(Modality::Image, image);
        let audio_emotion = reconcile_label(Modality::Audio, audio);

        let (final_emotion, confidence, fusion_method, weights) = if image_emotion == audio_emotion
        {
            let confidence = ((image.confidence + audio.confidence) / 2.0)
                .min(self.config.agreement_confidence_cap);
            (
                image_emotion.clone(),
                confidence,
                FusionMethod::Agreement,
                self.config.agreement_weights,
            )
        } else {
            let confidence = audio.confidence * self.config.disagreement_penalty;
            (
                audio_emotion.clone(),
                confidence,
                FusionMethod::AudioPriority,
                self.config.disagreement_weights,
            )
        };

        let weighted_distribution = blend(
            &reconcile_distribution(Modality::Image, image),
            &reconcile_distribution(Modality::Audio, audio),
            weights,
        );

        metrics::record_fusion(fusion_method);
        debug!(
            image = %image_emotion,
            audio = %audio_emotion,
            final_emotion = %final_emotion,
            confidence,
            method = %fusion_method,
            "Fused image and audio"
        );

        FusionResult {
            final_emotion,
            confidence,
            image_emotion,
            audio_emotion,
            image_confidence: image.confidence,
            audio_confidence: audio.confidence,
            fusion_method,
            weighted_distribution,
        }
    }
}

fn reconcile_label(modality: Modality, result: &ClassifierResult) -> EmotionLabel {
    let label = result.canonical_label();
    if !label.is_canonical() {
        warn!(%modality, label = %label, "Unmapped emotion label passed through");
        metrics::record_unmapped_label(modality);
    }
    label
}

fn reconcile_distribution(modality: Modality, result: &ClassifierResult) -> CanonicalDistribution {
    let reconciled = result.canonical_distribution();
    for native in &reconciled.unmapped {
        warn!(%modality, label = %native, "Unmapped distribution entry dropped");
        metrics::record_unmapped_label(modality);
    }
    reconciled.classes
}

/// Per-class `image_w * image[c] + audio_w * audio[c]`; missing classes are 0.
fn blend(
    image: &CanonicalDistribution,
    audio: &CanonicalDistribution,
    weights: ModalityWeights,
) -> CanonicalDistribution {
    CanonicalEmotion::ALL
        .iter()
        .map(|&emotion| {
            let p_image = image.get(&emotion).copied().unwrap_or(0.0);
            let p_audio = audio.get(&emotion).copied().unwrap_or(0.0);
            let blended = weights.image * p_image + weights.audio * p_audio;
            (emotion, blended.clamp(0.0, 1.0))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use emofuse_models::LabelDistribution;

    fn dist(entries: &[(&str, f64)]) -> LabelDistribution {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_agreement_averages_confidence() {
        let image = ClassifierResult::rich("angry", 0.8, LabelDistribution::new());
        let audio = ClassifierResult::rich("anger", 0.7, LabelDistribution::new());

        let fused = FusionEngine::default().fuse(&image, &audio);
        assert_eq!(fused.final_emotion, EmotionLabel::Canonical(CanonicalEmotion::Anger));
        assert!(close(fused.confidence, 0.75));
        assert_eq!(fused.fusion_method, FusionMethod::Agreement);
        assert!(close(fused.image_confidence, 0.8));
        assert!(close(fused.audio_confidence, 0.7));
    }

    #[test]
    fn test_agreement_confidence_is_capped() {
        let image = ClassifierResult::rich("happy", 0.99, LabelDistribution::new());
        let audio = ClassifierResult::rich("happiness", 0.98, LabelDistribution::new());

        let fused = FusionEngine::default().fuse(&image, &audio);
        assert!(close(fused.confidence, 0.95));
    }

    #[test]
    fn test_disagreement_takes_audio_with_penalty() {
        let image = ClassifierResult::rich("happy", 0.9, LabelDistribution::new());
        let audio = ClassifierResult::rich("sadness", 0.6, LabelDistribution::new());

        let fused = FusionEngine::default().fuse(&image, &audio);
        assert_eq!(fused.final_emotion, EmotionLabel::Canonical(CanonicalEmotion::Sadness));
        assert_eq!(fused.image_emotion, EmotionLabel::Canonical(CanonicalEmotion::Happiness));
        assert!(close(fused.confidence, 0.54));
        assert_eq!(fused.fusion_method, FusionMethod::AudioPriority);
    }

    #[test]
    fn test_weighted_distribution_blends_reconciled_classes() {
        let image = ClassifierResult::rich(
            "happy",
            0.6,
            dist(&[("happy", 0.6), ("sad", 0.3), ("angry", 0.1)]),
        );
        let audio = ClassifierResult::rich(
            "happiness",
            0.5,
            dist(&[("happiness", 0.5), ("neutral", 0.5)]),
        );

        let fused = FusionEngine::default().fuse(&image, &audio);
        let w = &fused.weighted_distribution;

        assert_eq!(w.len(), 7);
        assert!(close(w[&CanonicalEmotion::Happiness], 0.4 * 0.6 + 0.6 * 0.5));
        assert!(close(w[&CanonicalEmotion::Sadness], 0.4 * 0.3));
        assert!(close(w[&CanonicalEmotion::Neutral], 0.6 * 0.5));
        assert!(close(w[&CanonicalEmotion::Fear], 0.0));
    }

    #[test]
    fn test_weighted_distribution_is_bounded() {
        let cases = [
            (
                ClassifierResult::rich("fear", 1.0, dist(&[("fear", 1.0), ("sad", 1.0)])),
                ClassifierResult::rich("fear", 1.0, dist(&[("fear", 1.0), ("anger", 0.9)])),
            ),
            (
                ClassifierResult::rich("disgust", 0.3, dist(&[("disgust", 0.3), ("bored", 0.7)])),
                ClassifierResult::rich("surprise", 0.9, dist(&[("surprise", 2.0)])),
            ),
            (ClassifierResult::legacy("happy"), ClassifierResult::legacy("neutral")),
        ];

        for (image, audio) in &cases {
            let fused = FusionEngine::default().fuse(image, audio);
            let weights = match fused.fusion_method {
                FusionMethod::Agreement => FusionConfig::default().agreement_weights,
                FusionMethod::AudioPriority => FusionConfig::default().disagreement_weights,
            };
            let total: f64 = fused.weighted_distribution.values().sum();
            assert!(total <= weights.total() + 1e-9, "total {}", total);
            assert!(fused
                .weighted_distribution
                .values()
                .all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_legacy_inputs_fuse_without_distribution() {
        let fused = FusionEngine::default().fuse(
            &ClassifierResult::legacy("sad"),
            &ClassifierResult::legacy("sadness"),
        );
        assert_eq!(fused.fusion_method, FusionMethod::Agreement);
        assert!(close(fused.confidence, 0.5));
        assert!(fused.weighted_distribution.values().all(|p| *p == 0.0));
    }

    #[test]
    fn test_unmapped_labels_pass_through() {
        let fused = FusionEngine::default().fuse(
            &ClassifierResult::rich("contempt", 0.7, LabelDistribution::new()),
            &ClassifierResult::rich("neutral", 0.4, LabelDistribution::new()),
        );
        assert_eq!(fused.image_emotion, EmotionLabel::Unmapped("contempt".to_string()));
        assert_eq!(fused.final_emotion, EmotionLabel::Canonical(CanonicalEmotion::Neutral));
        assert_eq!(fused.fusion_method, FusionMethod::AudioPriority);
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let image = ClassifierResult::rich("surprise", 0.42, dist(&[("surprise", 0.42)]));
        let audio = ClassifierResult::rich("fear", 0.33, dist(&[("fear", 0.33)]));
        let engine = FusionEngine::default();
        assert_eq!(engine.fuse(&image, &audio), engine.fuse(&image, &audio));
    }
}
