//! Face localization and cropping.
//!
//! Detection runs an ordered list of strategies with first-success semantics:
//! 1. OpenCV YuNet (learned CNN detector, scored candidates)
//! 2. OpenCV Haar cascade (classical fallback, unscored candidates)
//!
//! The winning box is padded, clamped and resized by the [`RegionCropper`].

pub mod cascade;
pub mod crop;
pub mod detector;
pub mod localizer;
#[cfg(feature = "opencv")]
mod mat;
pub mod yunet;

pub use cascade::HaarCascadeDetector;
pub use crop::{FaceRegion, RegionCropper};
pub use detector::{FaceDetector, SelectionPolicy};
pub use localizer::{FaceLocalizer, LocatedFace};
pub use yunet::YuNetDetector;
