//! Bounding box crops.

use crate::store::BoundingBox;
use image::{RgbImage, imageops};

/// Crop `image` to `bbox`, clamped to the image bounds.
///
/// Returns `None` when the clamped box has no area.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
pub fn crop_to_bbox(image: &RgbImage, bbox: &BoundingBox) -> Option<RgbImage> {
    let (width, height) = image.dimensions();
    let clamp = |v: i32, max: u32| v.clamp(0, max as i32) as u32;

    let x_min = clamp(bbox.x_min, width);
    let y_min = clamp(bbox.y_min, height);
    let x_max = clamp(bbox.x_max, width);
    let y_max = clamp(bbox.y_max, height);

    if x_max <= x_min || y_max <= y_min {
        return None;
    }

    Some(imageops::crop_imm(image, x_min, y_min, x_max - x_min, y_max - y_min).to_image())
}
