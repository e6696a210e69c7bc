//! Species classifier via ONNX Runtime.

use crate::config::{ClassifierConfig, InferenceDevice};
use crate::constants::inference::{IMAGENET_MEAN, IMAGENET_STD};
use crate::error::{Error, Result};
use crate::inference::{Classification, SpeciesClassifier, build_session};
use image::{RgbImage, imageops};
use ort::session::Session;
use ort::value::{Tensor, Value};
use std::path::Path;
use tracing::info;

/// Square-input image classifier with a one-label-per-line labels file.
pub struct OnnxSpeciesClassifier {
    session: Session,
    labels: Vec<String>,
    input_size: u32,
}

impl OnnxSpeciesClassifier {
    /// Load the classifier described by `config`.
    pub fn from_config(config: &ClassifierConfig, device: InferenceDevice) -> Result<Self> {
        let model = config
            .model
            .as_deref()
            .ok_or(Error::ModelNotConfigured { kind: "classifier" })?;
        let labels_path = config
            .labels
            .as_deref()
            .ok_or(Error::ModelNotConfigured { kind: "classifier" })?;

        let labels = load_labels(labels_path)?;
        info!(
            "Loading classifier: {} ({} labels)",
            model.display(),
            labels.len()
        );
        let session = build_session(model, device)?;

        Ok(Self {
            session,
            labels,
            input_size: config.input_size,
        })
    }

    fn preprocess(&self, crop: &RgbImage) -> Result<Value> {
        let size = self.input_size;
        let resized = imageops::resize(crop, size, size, imageops::FilterType::Triangle);

        let side = size as usize;
        let mut chw = Vec::with_capacity(3 * side * side);
        for c in 0..3 {
            for pixel in resized.pixels() {
                let value = f32::from(pixel[c]) / 255.0;
                chw.push((value - IMAGENET_MEAN[c]) / IMAGENET_STD[c]);
            }
        }

        Tensor::from_array((vec![1usize, 3, side, side], chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| Error::Inference {
                reason: format!("failed to create tensor: {e}"),
            })
    }
}

impl SpeciesClassifier for OnnxSpeciesClassifier {
    fn classify(&mut self, crop: &RgbImage) -> Result<Classification> {
        let input = self.preprocess(crop)?;

        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| Error::Inference {
                reason: format!("classifier inference failed: {e}"),
            })?;

        let tensor = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Inference {
                reason: format!("failed to extract classifier output: {e}"),
            })?;

        let probabilities = softmax(tensor.1);
        let (index, confidence) = top1(&probabilities).ok_or_else(|| Error::Inference {
            reason: "classifier produced no scores".to_string(),
        })?;

        let label = self
            .labels
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Inference {
                reason: format!(
                    "class index {index} out of range for {} labels",
                    self.labels.len()
                ),
            })?;

        Ok(Classification { label, confidence })
    }
}

/// Read a labels file: one label per line, blank lines ignored.
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(Error::LabelsFileNotFound {
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.into_iter().map(|v| v / sum).collect()
    } else {
        exps
    }
}

/// Index and value of the highest score.
pub fn top1(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
}
