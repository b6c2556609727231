//! Face detector strategy trait.

use std::cmp::Ordering;

use emofuse_models::FaceCandidate;
use image::RgbImage;

use crate::error::MediaResult;

/// How to choose one face among a detector's candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Highest confidence first, larger area breaks ties.
    ConfidenceThenArea,
    /// Largest area (detectors without scores).
    LargestArea,
}

impl SelectionPolicy {
    /// Pick the best candidate, or `None` for an empty slice.
    ///
    /// Candidates without a finite score rank below any scored candidate.
    /// Among equal candidates the earliest one wins.
    pub fn select(&self, candidates: &[FaceCandidate]) -> Option<FaceCandidate> {
        let rank = |a: &FaceCandidate, b: &FaceCandidate| match self {
            SelectionPolicy::ConfidenceThenArea => score(a)
                .total_cmp(&score(b))
                .then(a.bbox.area().cmp(&b.bbox.area())),
            SelectionPolicy::LargestArea => a.bbox.area().cmp(&b.bbox.area()),
        };

        candidates.iter().copied().reduce(|best, candidate| {
            if rank(&candidate, &best) == Ordering::Greater {
                candidate
            } else {
                best
            }
        })
    }
}

fn score(candidate: &FaceCandidate) -> f64 {
    candidate
        .confidence
        .filter(|c| c.is_finite())
        .unwrap_or(f64::NEG_INFINITY)
}

/// Pluggable face detection strategy.
///
/// Implementations report their own failures as errors; the
/// [`crate::face::FaceLocalizer`] absorbs them and moves to the next strategy.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in an RGB image. Boxes are in source pixel coordinates.
    fn detect(&self, image: &RgbImage) -> MediaResult<Vec<FaceCandidate>>;

    /// How to choose among this detector's candidates.
    fn selection(&self) -> SelectionPolicy;

    /// Detector name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use emofuse_models::BoundingBox;

    #[test]
    fn test_confidence_beats_area() {
        let candidates = [
            FaceCandidate::scored(BoundingBox::new(0, 0, 200, 200), 0.80),
            FaceCandidate::scored(BoundingBox::new(300, 0, 40, 40), 0.99),
        ];
        let best = SelectionPolicy::ConfidenceThenArea.select(&candidates).unwrap();
        assert_eq!(best.bbox, BoundingBox::new(300, 0, 40, 40));
    }

    #[test]
    fn test_area_breaks_confidence_ties() {
        let candidates = [
            FaceCandidate::scored(BoundingBox::new(0, 0, 50, 50), 0.95),
            FaceCandidate::scored(BoundingBox::new(100, 0, 80, 80), 0.95),
            FaceCandidate::scored(BoundingBox::new(200, 0, 60, 60), 0.95),
        ];
        let best = SelectionPolicy::ConfidenceThenArea.select(&candidates).unwrap();
        assert_eq!(best.bbox, BoundingBox::new(100, 0, 80, 80));
    }

    #[test]
    fn test_largest_area_ignores_confidence() {
        let candidates = [
            FaceCandidate::scored(BoundingBox::new(0, 0, 50, 50), 0.99),
            FaceCandidate::unscored(BoundingBox::new(100, 0, 90, 70)),
        ];
        let best = SelectionPolicy::LargestArea.select(&candidates).unwrap();
        assert_eq!(best.bbox, BoundingBox::new(100, 0, 90, 70));
    }

    #[test]
    fn test_full_ties_keep_first_candidate() {
        let scored = [
            FaceCandidate::scored(BoundingBox::new(10, 0, 60, 60), 0.9),
            FaceCandidate::scored(BoundingBox::new(200, 0, 60, 60), 0.9),
        ];
        let best = SelectionPolicy::ConfidenceThenArea.select(&scored).unwrap();
        assert_eq!(best.bbox, BoundingBox::new(10, 0, 60, 60));

        let unscored = [
            FaceCandidate::unscored(BoundingBox::new(5, 5, 40, 90)),
            FaceCandidate::unscored(BoundingBox::new(100, 5, 90, 40)),
            FaceCandidate::unscored(BoundingBox::new(200, 5, 60, 60)),
        ];
        let best = SelectionPolicy::LargestArea.select(&unscored).unwrap();
        assert_eq!(best.bbox, BoundingBox::new(5, 5, 40, 90));
    }

    #[test]
    fn test_nan_confidence_ranks_as_unscored() {
        let candidates = [
            FaceCandidate::scored(BoundingBox::new(0, 0, 120, 120), f64::NAN),
            FaceCandidate::scored(BoundingBox::new(200, 0, 40, 40), 0.5),
        ];
        let best = SelectionPolicy::ConfidenceThenArea.select(&candidates).unwrap();
        assert_eq!(best.bbox, BoundingBox::new(200, 0, 40, 40));
    }

    #[test]
    fn test_empty_candidates() {
        assert!(SelectionPolicy::ConfidenceThenArea.select(&[]).is_none());
        assert!(SelectionPolicy::LargestArea.select(&[]).is_none());
    }
}
