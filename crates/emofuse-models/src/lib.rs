//! Shared data models for the EmoFuse emotion pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - The canonical emotion taxonomy and per-classifier label reconciliation
//! - Classifier outputs (legacy bare labels and rich distributions)
//! - Face bounding boxes and detector candidates
//! - Fusion decisions returned to callers

pub mod classifier;
pub mod emotion;
pub mod fusion;
pub mod geometry;
pub mod labels;
pub mod modality;

// Re-export common types
pub use classifier::{ClassifierResult, LabelDistribution, ModelOutput, UNKNOWN_CONFIDENCE};
pub use emotion::{CanonicalEmotion, EmotionLabel, LabelParseError};
pub use fusion::{FusionMethod, FusionResult};
pub use geometry::{BoundingBox, FaceCandidate};
pub use labels::{canonicalize, canonicalize_distribution, CanonicalDistribution, ReconciledDistribution};
pub use modality::Modality;
