//! Detector and species classifier backends.
//!
//! The passes depend only on the [`Detector`] and [`SpeciesClassifier`]
//! traits; the ONNX Runtime implementations live behind them.

mod classifier;
mod detector;
mod session;

pub use classifier::{OnnxSpeciesClassifier, load_labels, softmax, top1};
pub use detector::{OnnxDetector, Letterbox};
pub use session::build_session;

use crate::error::Result;
use image::RgbImage;
use std::path::Path;

/// One detector hit in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// `[x_min, y_min, x_max, y_max]`.
    pub bbox: [f32; 4],
    /// Detector class id (`0` animal, `1` person, `2` vehicle).
    pub class_id: i32,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Top-1 species prediction for a crop.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Species label.
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

/// An animal/person/vehicle detector.
pub trait Detector {
    /// Detect objects in the image at `image`, in detector output order.
    fn detect(&mut self, image: &Path) -> Result<Vec<RawDetection>>;
}

/// A species classifier for animal crops.
pub trait SpeciesClassifier {
    /// Classify a single crop.
    fn classify(&mut self, crop: &RgbImage) -> Result<Classification>;
}
