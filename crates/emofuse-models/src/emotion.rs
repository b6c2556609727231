//! Canonical emotion taxonomy.
//!
//! Both classifiers speak their own vocabulary. Before fusion every native
//! label is mapped into the fixed seven-class set defined here:
//!
//! - `anger`, `disgust`, `fear`, `happiness`, `neutral`, `sadness`, `surprise`

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One class of the canonical emotion taxonomy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalEmotion {
    Anger,
    Disgust,
    Fear,
    Happiness,
    Neutral,
    Sadness,
    Surprise,
}

impl CanonicalEmotion {
    /// All canonical classes, in taxonomy order.
    pub const ALL: &'static [CanonicalEmotion] = &[
        CanonicalEmotion::Anger,
        CanonicalEmotion::Disgust,
        CanonicalEmotion::Fear,
        CanonicalEmotion::Happiness,
        CanonicalEmotion::Neutral,
        CanonicalEmotion::Sadness,
        CanonicalEmotion::Surprise,
    ];

    /// Returns the canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalEmotion::Anger => "anger",
            CanonicalEmotion::Disgust => "disgust",
            CanonicalEmotion::Fear => "fear",
            CanonicalEmotion::Happiness => "happiness",
            CanonicalEmotion::Neutral => "neutral",
            CanonicalEmotion::Sadness => "sadness",
            CanonicalEmotion::Surprise => "surprise",
        }
    }
}

impl fmt::Display for CanonicalEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strict parse: only canonical names are accepted.
///
/// Use [`crate::labels::canonicalize`] for native classifier vocabularies.
impl FromStr for CanonicalEmotion {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalEmotion::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| LabelParseError(s.to_string()))
    }
}

#[derive(Debug, Error)]
#[error("Not a canonical emotion: {0}")]
pub struct LabelParseError(pub String);

/// A reconciled label.
///
/// Native labels missing from the reconciliation table are carried through
/// unchanged as `Unmapped` so callers can tell them apart from trusted
/// canonical classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EmotionLabel {
    Canonical(CanonicalEmotion),
    Unmapped(String),
}

impl EmotionLabel {
    pub fn as_str(&self) -> &str {
        match self {
            EmotionLabel::Canonical(e) => e.as_str(),
            EmotionLabel::Unmapped(raw) => raw.as_str(),
        }
    }

    /// The canonical class, if the label was mapped.
    pub fn canonical(&self) -> Option<CanonicalEmotion> {
        match self {
            EmotionLabel::Canonical(e) => Some(*e),
            EmotionLabel::Unmapped(_) => None,
        }
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self, EmotionLabel::Canonical(_))
    }
}

// Serialized as a bare string.
impl JsonSchema for EmotionLabel {
    fn schema_name() -> String {
        "EmotionLabel".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CanonicalEmotion> for EmotionLabel {
    fn from(e: CanonicalEmotion) -> Self {
        EmotionLabel::Canonical(e)
    }
}

impl From<String> for EmotionLabel {
    fn from(raw: String) -> Self {
        crate::labels::canonicalize(&raw)
    }
}

impl From<EmotionLabel> for String {
    fn from(label: EmotionLabel) -> Self {
        match label {
            EmotionLabel::Canonical(e) => e.as_str().to_string(),
            EmotionLabel::Unmapped(raw) => raw,
        }
    }
}
