//! Output heads: raw scores to a [`ModelOutput`].

use std::fmt;
use std::str::FromStr;

use emofuse_models::{LabelDistribution, Modality, ModelOutput};

use crate::error::{MediaError, MediaResult};

/// Return shape of a model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputShape {
    /// Label, confidence and full softmax distribution
    #[default]
    Rich,
    /// Bare top label only
    Legacy,
}

impl OutputShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputShape::Rich => "rich",
            OutputShape::Legacy => "legacy",
        }
    }
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rich" => Ok(OutputShape::Rich),
            "legacy" => Ok(OutputShape::Legacy),
            other => Err(format!("unknown output shape: {}", other)),
        }
    }
}

/// Maps a score vector onto a classifier vocabulary.
#[derive(Debug, Clone)]
pub struct OutputHead {
    modality: Modality,
    labels: Vec<String>,
    shape: OutputShape,
}

impl OutputHead {
    pub fn new(modality: Modality, labels: Vec<String>, shape: OutputShape) -> Self {
        Self {
            modality,
            labels,
            shape,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn shape(&self) -> OutputShape {
        self.shape
    }

    /// Decode raw logits.
    ///
    /// A score vector that does not match the vocabulary, or holds a
    /// non-finite value, is a classification failure.
    pub fn decode(&self, scores: &[f32]) -> MediaResult<ModelOutput> {
        if self.labels.is_empty() || scores.len() != self.labels.len() {
            return Err(MediaError::classification_failed(
                self.modality,
                format!(
                    "Model returned {} scores for {} labels",
                    scores.len(),
                    self.labels.len()
                ),
            ));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(MediaError::classification_failed(
                self.modality,
                "Model returned non-finite scores",
            ));
        }

        let top = argmax(scores);
        let label = self.labels[top].clone();

        match self.shape {
            OutputShape::Legacy => Ok(ModelOutput::Legacy { label }),
            OutputShape::Rich => {
                let probabilities = softmax(scores);
                let distribution: LabelDistribution = self
                    .labels
                    .iter()
                    .cloned()
                    .zip(probabilities.iter().map(|&p| p as f64))
                    .collect();
                Ok(ModelOutput::Rich {
                    label,
                    confidence: probabilities[top] as f64,
                    distribution,
                })
            }
        }
    }
}

/// Numerically stable softmax.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the first maximum.
fn argmax(scores: &[f32]) -> usize {
    let mut best = 0;
    for (i, s) in scores.iter().enumerate().skip(1) {
        if *s > scores[best] {
            best = i;
        }
    }
    best
}
