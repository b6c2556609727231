//! Classifier result shapes.
//!
//! Model variants disagree on what they return: legacy heads only give a bare
//! label, richer heads give a confidence and a full distribution. Both are
//! captured by [`ModelOutput`] and always upgraded to [`ClassifierResult`].

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::emotion::EmotionLabel;
use crate::labels::{canonicalize, canonicalize_distribution, ReconciledDistribution};

/// Label -> probability in `[0, 1]`. Keys are in the classifier's native vocabulary.
pub type LabelDistribution = BTreeMap<String, f64>;

/// Confidence reported when the model gives none ("unknown / low trust").
pub const UNKNOWN_CONFIDENCE: f64 = 0.5;

/// Raw output of a model head, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ModelOutput {
    /// Bare top label only.
    Legacy { label: String },
    /// Top label with its confidence and the full distribution.
    Rich {
        label: String,
        confidence: f64,
        distribution: LabelDistribution,
    },
}

/// Normalized classifier output, identical for every modality and model variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassifierResult {
    /// Top label in the classifier's native vocabulary
    pub label: String,
    /// Confidence of the top label (0.0-1.0)
    pub confidence: f64,
    /// Full distribution; empty for legacy models
    pub distribution: LabelDistribution,
}

impl ClassifierResult {
    /// Create a result from a bare label.
    pub fn legacy(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidence: UNKNOWN_CONFIDENCE,
            distribution: LabelDistribution::new(),
        }
    }

    /// Create a result with an explicit confidence and distribution.
    pub fn rich(label: impl Into<String>, confidence: f64, distribution: LabelDistribution) -> Self {
        Self {
            label: label.into(),
            confidence: clamp_unit(confidence),
            distribution,
        }
    }

    /// Whether this result carries no distribution (legacy shape).
    pub fn is_legacy(&self) -> bool {
        self.distribution.is_empty()
    }

    /// Top label reconciled onto the canonical taxonomy.
    pub fn canonical_label(&self) -> EmotionLabel {
        canonicalize(&self.label)
    }

    /// Distribution reconciled onto the canonical taxonomy.
    pub fn canonical_distribution(&self) -> ReconciledDistribution {
        canonicalize_distribution(&self.distribution)
    }
}

impl From<ModelOutput> for ClassifierResult {
    fn from(output: ModelOutput) -> Self {
        match output {
            ModelOutput::Legacy { label } => ClassifierResult::legacy(label),
            ModelOutput::Rich {
                label,
                confidence,
                distribution,
            } => ClassifierResult::rich(label, confidence, distribution),
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        UNKNOWN_CONFIDENCE
    }
}
