//! Label reconciliation.
//!
//! A static table maps every native classifier label onto the canonical
//! taxonomy. The image classifier emits adjectives (`happy`, `sad`, `angry`);
//! the audio classifier already emits canonical nouns, which map to themselves.
//!
//! Labels missing from the table are passed through as
//! [`EmotionLabel::Unmapped`], never rejected.

use std::collections::BTreeMap;

use crate::classifier::LabelDistribution;
use crate::emotion::{CanonicalEmotion, EmotionLabel};

/// Per-class probabilities over the canonical taxonomy.
pub type CanonicalDistribution = BTreeMap<CanonicalEmotion, f64>;

/// Native vocabulary -> canonical class.
const RECONCILIATION_TABLE: &[(&str, CanonicalEmotion)] = &[
    // Canonical names map to themselves
    ("anger", CanonicalEmotion::Anger),
    ("disgust", CanonicalEmotion::Disgust),
    ("fear", CanonicalEmotion::Fear),
    ("happiness", CanonicalEmotion::Happiness),
    ("neutral", CanonicalEmotion::Neutral),
    ("sadness", CanonicalEmotion::Sadness),
    ("surprise", CanonicalEmotion::Surprise),
    // Image classifier vocabulary
    ("angry", CanonicalEmotion::Anger),
    ("happy", CanonicalEmotion::Happiness),
    ("sad", CanonicalEmotion::Sadness),
    // Adjectival aliases
    ("disgusted", CanonicalEmotion::Disgust),
    ("fearful", CanonicalEmotion::Fear),
    ("surprised", CanonicalEmotion::Surprise),
];

/// Map a native label to the canonical taxonomy.
///
/// Matching ignores ASCII case and surrounding whitespace. Unknown labels
/// come back unchanged inside [`EmotionLabel::Unmapped`].
pub fn canonicalize(native: &str) -> EmotionLabel {
    let key = native.trim();
    RECONCILIATION_TABLE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, emotion)| EmotionLabel::Canonical(*emotion))
        .unwrap_or_else(|| EmotionLabel::Unmapped(native.to_string()))
}

/// A native distribution folded onto the canonical taxonomy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciledDistribution {
    /// Sanitized per-class probabilities. Classes with no native entry are absent.
    pub classes: CanonicalDistribution,
    /// Native labels that had no canonical counterpart (their mass is dropped).
    pub unmapped: Vec<String>,
}

impl ReconciledDistribution {
    /// Probability of a class, `0.0` when absent.
    pub fn get(&self, emotion: CanonicalEmotion) -> f64 {
        self.classes.get(&emotion).copied().unwrap_or(0.0)
    }

    /// Total probability mass across canonical classes.
    pub fn total(&self) -> f64 {
        self.classes.values().sum()
    }
}

/// Fold a native distribution onto the canonical taxonomy.
///
/// Native entries mapping to the same class are summed. The result is
/// sanitized so every class lies in `[0, 1]` and the total mass is at most 1:
/// non-finite and negative inputs count as zero, and an over-full
/// distribution is rescaled.
pub fn canonicalize_distribution(distribution: &LabelDistribution) -> ReconciledDistribution {
    let mut reconciled = ReconciledDistribution::default();

    for (native, &probability) in distribution {
        match canonicalize(native) {
            EmotionLabel::Canonical(emotion) => {
                let p = if probability.is_finite() { probability.max(0.0) } else { 0.0 };
                *reconciled.classes.entry(emotion).or_insert(0.0) += p;
            }
            EmotionLabel::Unmapped(raw) => reconciled.unmapped.push(raw),
        }
    }

    for p in reconciled.classes.values_mut() {
        *p = p.min(1.0);
    }

    let total = reconciled.total();
    if total > 1.0 {
        for p in reconciled.classes.values_mut() {
            *p /= total;
        }
    }

    reconciled
}
