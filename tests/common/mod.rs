//! Shared helpers for integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use camtrap::inference::{Classification, Detector, RawDetection, SpeciesClassifier};
use camtrap::{Error, Result};
use image::{Rgb, RgbImage};
use std::collections::HashMap;
use std::path::Path;

/// Write a solid-colour JPEG of the given size.
pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) {
    let image = RgbImage::from_pixel(width, height, Rgb([90, 120, 60]));
    image.save(dir.join(name)).unwrap();
}

/// Detector returning canned detections per file name.
#[derive(Default)]
pub struct ScriptedDetector {
    responses: HashMap<String, Vec<RawDetection>>,
    failing: Vec<String>,
    pub calls: Vec<String>,
}

impl ScriptedDetector {
    pub fn with(mut self, name: &str, detections: Vec<RawDetection>) -> Self {
        self.responses.insert(name.to_string(), detections);
        self
    }

    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, image: &Path) -> Result<Vec<RawDetection>> {
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls.push(name.clone());
        if self.failing.contains(&name) {
            return Err(Error::Inference {
                reason: format!("scripted failure on {name}"),
            });
        }
        Ok(self.responses.get(&name).cloned().unwrap_or_default())
    }
}

/// Classifier that always returns the same label.
pub struct FixedClassifier {
    pub label: String,
    pub confidence: f32,
    pub calls: usize,
}

impl FixedClassifier {
    pub fn new(label: &str, confidence: f32) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            calls: 0,
        }
    }
}

impl SpeciesClassifier for FixedClassifier {
    fn classify(&mut self, _crop: &RgbImage) -> Result<Classification> {
        self.calls += 1;
        Ok(Classification {
            label: self.label.clone(),
            confidence: self.confidence,
        })
    }
}

pub fn detection(bbox: [f32; 4], class_id: i32, confidence: f32) -> RawDetection {
    RawDetection {
        bbox,
        class_id,
        confidence,
    }
}
