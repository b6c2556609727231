//! Fusion decision returned to callers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::emotion::EmotionLabel;
use crate::labels::CanonicalDistribution;

/// Which combination policy produced the final decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    /// Both channels named the same class.
    Agreement,
    /// Channels disagreed; the audio label was taken.
    AudioPriority,
}

impl FusionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionMethod::Agreement => "agreement",
            FusionMethod::AudioPriority => "audio_priority",
        }
    }
}

impl fmt::Display for FusionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconciled multimodal decision. Built once per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FusionResult {
    pub final_emotion: EmotionLabel,
    /// Confidence of the final decision (0.0-1.0)
    pub confidence: f64,
    pub image_emotion: EmotionLabel,
    pub audio_emotion: EmotionLabel,
    pub image_confidence: f64,
    pub audio_confidence: f64,
    pub fusion_method: FusionMethod,
    /// Per-class blend of both channels, for auditing only
    pub weighted_distribution: CanonicalDistribution,
}

impl FusionResult {
    /// Whether both channels named the same class.
    pub fn is_agreement(&self) -> bool {
        self.fusion_method == FusionMethod::Agreement
    }
}
