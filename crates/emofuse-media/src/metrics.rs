//! Inference metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder. Without a recorder these calls are no-ops.

use emofuse_models::{FusionMethod, Modality};
use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const DETECTOR_FAILURES_TOTAL: &str = "emofuse_detector_failures_total";
    pub const DETECTOR_FALLBACKS_TOTAL: &str = "emofuse_detector_fallbacks_total";
    pub const NO_FACE_TOTAL: &str = "emofuse_no_face_total";
    pub const UNMAPPED_LABELS_TOTAL: &str = "emofuse_unmapped_labels_total";
    pub const CLASSIFICATIONS_TOTAL: &str = "emofuse_classifications_total";
    pub const CLASSIFICATION_FAILURES_TOTAL: &str = "emofuse_classification_failures_total";
    pub const INFERENCE_DURATION_SECONDS: &str = "emofuse_inference_duration_seconds";
    pub const FUSIONS_TOTAL: &str = "emofuse_fusions_total";
}

/// A face detector raised an error and was skipped.
pub fn record_detector_failure(detector: &str) {
    let labels = [("detector", detector.to_string())];
    counter!(names::DETECTOR_FAILURES_TOTAL, &labels).increment(1);
}

/// A lower-priority detector found the face.
pub fn record_detector_fallback(detector: &str) {
    let labels = [("detector", detector.to_string())];
    counter!(names::DETECTOR_FALLBACKS_TOTAL, &labels).increment(1);
}

pub fn record_no_face() {
    counter!(names::NO_FACE_TOTAL).increment(1);
}

/// A classifier emitted a label outside the canonical taxonomy.
pub fn record_unmapped_label(modality: Modality) {
    let labels = [("modality", modality.as_str().to_string())];
    counter!(names::UNMAPPED_LABELS_TOTAL, &labels).increment(1);
}

/// Record a successful classification and its latency.
pub fn record_classification(modality: Modality, duration_secs: f64) {
    let labels = [("modality", modality.as_str().to_string())];
    counter!(names::CLASSIFICATIONS_TOTAL, &labels).increment(1);
    histogram!(names::INFERENCE_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_classification_failure(modality: Modality) {
    let labels = [("modality", modality.as_str().to_string())];
    counter!(names::CLASSIFICATION_FAILURES_TOTAL, &labels).increment(1);
}

/// Record which fusion policy produced a decision.
pub fn record_fusion(method: FusionMethod) {
    let labels = [("method", method.as_str().to_string())];
    counter!(names::FUSIONS_TOTAL, &labels).increment(1);
}
