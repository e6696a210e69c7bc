//! Configuration type definitions.

use crate::constants::inference::{
    CLASSIFIER_INPUT_SIZE, DETECTOR_INPUT_SIZE, DETECTOR_MIN_CONFIDENCE,
};
use crate::constants::visualize::{DEFAULT_BOX_THICKNESS, DEFAULT_LABEL_SCALE};
use crate::constants::{DEFAULT_CLASSIFICATION_THRESHOLD, DEFAULT_DETECTION_FLOOR, defaults};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decision thresholds shared by the passes.
    pub thresholds: Thresholds,

    /// Detector model settings.
    pub detector: DetectorConfig,

    /// Species classifier settings.
    pub classifier: ClassifierConfig,

    /// Inference settings.
    pub inference: InferenceConfig,

    /// Default output locations for `run`.
    pub paths: PathsConfig,

    /// Annotation drawing style.
    pub visualize: VisualizeConfig,
}

/// Decision thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Classification confidence above which a species is trusted.
    pub classification: f64,
    /// Detection confidence above which an image counts as non-empty.
    pub detection_floor: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            classification: DEFAULT_CLASSIFICATION_THRESHOLD,
            detection_floor: DEFAULT_DETECTION_FLOOR,
        }
    }
}

impl Thresholds {
    /// Whether a classification confidence is high enough to trust the species.
    pub fn is_confident(&self, classification_confidence: f64) -> bool {
        classification_confidence > self.classification
    }
}

/// Detector model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to the ONNX detector.
    pub model: Option<PathBuf>,
    /// Square model input size in pixels.
    pub input_size: u32,
    /// Rows below this score are discarded.
    pub min_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: None,
            input_size: DETECTOR_INPUT_SIZE,
            min_confidence: DETECTOR_MIN_CONFIDENCE,
        }
    }
}

/// Species classifier settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Path to the ONNX classifier.
    pub model: Option<PathBuf>,
    /// Path to the labels file.
    pub labels: Option<PathBuf>,
    /// Square model input size in pixels.
    pub input_size: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: None,
            labels: None,
            input_size: CLASSIFIER_INPUT_SIZE,
        }
    }
}

/// Inference device configuration.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    /// Automatically select (GPU if available, else CPU).
    #[default]
    Auto,
    /// Prefer GPU (CUDA), warn on CPU fallback.
    Gpu,
    /// Force CPU inference.
    Cpu,
}

/// Inference settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Device to use for inference.
    pub device: InferenceDevice,
}

/// Default output locations for the `run` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Master detection log.
    pub store: PathBuf,
    /// Exported JSON document.
    pub json: PathBuf,
    /// Parent of the `empty`/`non-empty` folders.
    pub sorted: PathBuf,
    /// Annotated images.
    pub annotated: PathBuf,
    /// Species crop folders.
    pub crops: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            store: PathBuf::from(defaults::STORE),
            json: PathBuf::from(defaults::JSON),
            sorted: PathBuf::from(defaults::SORTED),
            annotated: PathBuf::from(defaults::ANNOTATED),
            crops: PathBuf::from(defaults::CROPS),
        }
    }
}

/// Annotation drawing style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizeConfig {
    /// Font file for labels; system fonts are tried when unset.
    pub font: Option<PathBuf>,
    /// Box outline thickness in pixels.
    pub box_thickness: u32,
    /// Label font size in pixels.
    pub label_scale: f32,
}

impl Default for VisualizeConfig {
    fn default() -> Self {
        Self {
            font: None,
            box_thickness: DEFAULT_BOX_THICKNESS,
            label_scale: DEFAULT_LABEL_SCALE,
        }
    }
}
