//! Face geometry in integer pixel coordinates (top-left origin).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Bounding box in pixel coordinates.
///
/// Coordinates are signed so a padded box may extend past the image before
/// it is clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub x: i32,
    /// Top edge y-coordinate
    pub y: i32,
    /// Box width
    #[serde(rename = "w")]
    pub width: i32,
    /// Box height
    #[serde(rename = "h")]
    pub height: i32,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge x-coordinate (exclusive).
    #[inline]
    pub fn x2(&self) -> i32 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate (exclusive).
    #[inline]
    pub fn y2(&self) -> i32 {
        self.y + self.height
    }

    /// Box area in pixels; zero for degenerate boxes.
    #[inline]
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    /// True when the box has no positive width or height.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Return a new box grown by `padding` pixels on every side.
    pub fn pad(&self, padding: i32) -> BoundingBox {
        BoundingBox {
            x: self.x - padding,
            y: self.y - padding,
            width: self.width + 2 * padding,
            height: self.height + 2 * padding,
        }
    }

    /// Intersect the box with a `frame_width` x `frame_height` image.
    ///
    /// Returns `None` when nothing of the box is left inside the frame.
    pub fn clamp(&self, frame_width: u32, frame_height: u32) -> Option<BoundingBox> {
        let frame_width = i32::try_from(frame_width).unwrap_or(i32::MAX);
        let frame_height = i32::try_from(frame_height).unwrap_or(i32::MAX);

        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.x2().min(frame_width);
        let y2 = self.y2().min(frame_height);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(BoundingBox {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        })
    }
}

/// A face proposed by one detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FaceCandidate {
    pub bbox: BoundingBox,
    /// Detector score (0.0-1.0); `None` for detectors that give no score
    pub confidence: Option<f64>,
}

impl FaceCandidate {
    /// Candidate from a scoring detector.
    pub fn scored(bbox: BoundingBox, confidence: f64) -> Self {
        Self {
            bbox,
            confidence: Some(confidence),
        }
    }

    /// Candidate from a detector without scores.
    pub fn unscored(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            confidence: None,
        }
    }
}
