//! MegaDetector (end-to-end YOLO export) via ONNX Runtime.

use crate::config::{DetectorConfig, InferenceDevice};
use crate::constants::inference::DETECTION_ROW_LEN;
use crate::error::{Error, Result};
use crate::imaging::open_rgb;
use crate::inference::{Detector, RawDetection, build_session};
use image::{Rgb, RgbImage, imageops};
use ort::session::Session;
use ort::value::{Tensor, Value};
use std::path::Path;
use tracing::{debug, info};

const PAD_VALUE: u8 = 114;

/// Letterbox geometry: how the source image was placed on the model canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Source-to-canvas scale factor.
    pub scale: f32,
    /// Horizontal padding in canvas pixels.
    pub pad_x: f32,
    /// Vertical padding in canvas pixels.
    pub pad_y: f32,
    /// Source width.
    pub width: u32,
    /// Source height.
    pub height: u32,
}

impl Letterbox {
    /// Geometry for fitting a `width` x `height` image onto a `size` square.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let new_w = (width as f32 * scale).round();
        let new_h = (height as f32 * scale).round();
        Self {
            scale,
            pad_x: ((size as f32 - new_w) / 2.0).floor(),
            pad_y: ((size as f32 - new_h) / 2.0).floor(),
            width,
            height,
        }
    }

    /// Map a canvas-space `xyxy` box back to source pixels, clamped to the image.
    #[allow(clippy::cast_precision_loss)]
    pub fn unmap(&self, xyxy: [f32; 4]) -> [f32; 4] {
        let w = self.width as f32;
        let h = self.height as f32;
        [
            ((xyxy[0] - self.pad_x) / self.scale).clamp(0.0, w),
            ((xyxy[1] - self.pad_y) / self.scale).clamp(0.0, h),
            ((xyxy[2] - self.pad_x) / self.scale).clamp(0.0, w),
            ((xyxy[3] - self.pad_y) / self.scale).clamp(0.0, h),
        ]
    }
}

/// ONNX Runtime MegaDetector.
///
/// Expects an export with built-in NMS whose single output is
/// `[1, N, 6]` rows of `x1 y1 x2 y2 score class` in canvas pixels.
pub struct OnnxDetector {
    session: Session,
    input_size: u32,
    min_confidence: f32,
}

impl OnnxDetector {
    /// Load the detector described by `config`.
    pub fn from_config(config: &DetectorConfig, device: InferenceDevice) -> Result<Self> {
        let model = config
            .model
            .as_deref()
            .ok_or(Error::ModelNotConfigured { kind: "detector" })?;

        info!("Loading detector: {}", model.display());
        let session = build_session(model, device)?;

        Ok(Self {
            session,
            input_size: config.input_size,
            min_confidence: config.min_confidence,
        })
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn preprocess(&self, image: &RgbImage) -> Result<(Value, Letterbox)> {
        let size = self.input_size;
        let letterbox = Letterbox::fit(image.width(), image.height(), size);

        let new_w = ((image.width() as f32 * letterbox.scale).round() as u32).clamp(1, size);
        let new_h = ((image.height() as f32 * letterbox.scale).round() as u32).clamp(1, size);
        let resized = imageops::resize(image, new_w, new_h, imageops::FilterType::Triangle);

        let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
        imageops::replace(
            &mut canvas,
            &resized,
            i64::from(letterbox.pad_x as u32),
            i64::from(letterbox.pad_y as u32),
        );

        let side = size as usize;
        let mut chw = Vec::with_capacity(3 * side * side);
        for c in 0..3 {
            for pixel in canvas.pixels() {
                chw.push(f32::from(pixel[c]) / 255.0);
            }
        }

        let tensor = Tensor::from_array((vec![1usize, 3, side, side], chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| Error::Inference {
                reason: format!("failed to create tensor: {e}"),
            })?;

        Ok((tensor, letterbox))
    }

    fn run(&mut self, input: Value) -> Result<Vec<f32>> {
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| Error::Inference {
                reason: format!("detector inference failed: {e}"),
            })?;

        let tensor = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Inference {
                reason: format!("failed to extract detector output: {e}"),
            })?;

        Ok(tensor.1.to_vec())
    }
}

impl Detector for OnnxDetector {
    fn detect(&mut self, image: &Path) -> Result<Vec<RawDetection>> {
        let rgb = open_rgb(image)?;
        let (input, letterbox) = self.preprocess(&rgb)?;
        let output = self.run(input)?;
        let detections = parse_detections(&output, &letterbox, self.min_confidence)?;
        debug!("{}: {} detection(s)", image.display(), detections.len());
        Ok(detections)
    }
}

/// Decode `x1 y1 x2 y2 score class` rows, keeping those at or above `min_confidence`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn parse_detections(
    output: &[f32],
    letterbox: &Letterbox,
    min_confidence: f32,
) -> Result<Vec<RawDetection>> {
    if output.len() % DETECTION_ROW_LEN != 0 {
        return Err(Error::Inference {
            reason: format!(
                "detector output length {} is not a multiple of {DETECTION_ROW_LEN}",
                output.len()
            ),
        });
    }

    Ok(output
        .chunks_exact(DETECTION_ROW_LEN)
        .filter(|row| row[4] >= min_confidence)
        .map(|row| RawDetection {
            bbox: letterbox.unmap([row[0], row[1], row[2], row[3]]),
            class_id: row[5].round() as i32,
            confidence: row[4],
        })
        .collect())
}
