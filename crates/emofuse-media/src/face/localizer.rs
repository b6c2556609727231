//! Face localizer with an ordered fallback chain of detectors.

use std::sync::Arc;

use emofuse_models::{BoundingBox, FaceCandidate};
use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::detector::FaceDetector;
use crate::metrics;

/// The face chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocatedFace {
    /// Face box clamped to the image
    pub bbox: BoundingBox,
    /// Detector score, when the winning detector provides one
    pub confidence: Option<f64>,
    /// Name of the strategy that found the face
    pub detector: &'static str,
}

/// Finds the primary face of an image.
///
/// Strategies are tried in order and the first one that yields at least one
/// usable candidate wins. A strategy that errors is logged and skipped, so
/// detector failures never reach the caller: the worst outcome is `None`.
#[derive(Clone, Default)]
pub struct FaceLocalizer {
    strategies: Vec<Arc<dyn FaceDetector>>,
}

impl FaceLocalizer {
    /// Create a localizer from strategies in priority order.
    pub fn new(strategies: Vec<Arc<dyn FaceDetector>>) -> Self {
        Self { strategies }
    }

    /// Append a strategy at the lowest priority.
    pub fn with_strategy(mut self, strategy: Arc<dyn FaceDetector>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Strategy names in priority order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Locate the primary face. `None` means no strategy found one.
    pub fn locate(&self, image: &RgbImage) -> Option<LocatedFace> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            debug!("Empty image provided to face localizer");
            return None;
        }

        for (rank, strategy) in self.strategies.iter().enumerate() {
            let candidates = match strategy.detect(image) {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(
                        detector = strategy.name(),
                        "Face detector failed: {}, falling back", e
                    );
                    metrics::record_detector_failure(strategy.name());
                    continue;
                }
            };

            let usable: Vec<FaceCandidate> = candidates
                .into_iter()
                .filter_map(|c| {
                    c.bbox.clamp(width, height).map(|bbox| FaceCandidate { bbox, ..c })
                })
                .collect();

            let Some(best) = strategy.selection().select(&usable) else {
                debug!(detector = strategy.name(), "No face candidates, falling back");
                continue;
            };

            if rank > 0 {
                info!(detector = strategy.name(), "Face found by fallback detector");
                metrics::record_detector_fallback(strategy.name());
            }
            debug!(
                detector = strategy.name(),
                candidates = usable.len(),
                x = best.bbox.x,
                y = best.bbox.y,
                w = best.bbox.width,
                h = best.bbox.height,
                "Face located"
            );

            return Some(LocatedFace {
                bbox: best.bbox,
                confidence: best.confidence,
                detector: strategy.name(),
            });
        }

        debug!(strategies = self.strategies.len(), "No face found by any detector");
        None
    }
}
