//! Box and label drawing for annotated images.

use crate::constants::visualize::{LABEL_PADDING, SYSTEM_FONTS};
use crate::store::{BoundingBox, DetectorClass};
use ab_glyph::FontVec;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{debug, info, warn};

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Box colours by detector class.
const ANIMAL_COLOR: Rgb<u8> = Rgb([163, 81, 251]);
const PERSON_COLOR: Rgb<u8> = Rgb([56, 148, 255]);
const VEHICLE_COLOR: Rgb<u8> = Rgb([255, 64, 64]);
const OTHER_COLOR: Rgb<u8> = Rgb([255, 203, 0]);

/// Drawing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawStyle {
    /// Box outline thickness in pixels.
    pub box_thickness: u32,
    /// Label font size in pixels.
    pub label_scale: f32,
}

/// Load a font from `configured`, falling back to common system fonts.
///
/// Returns `None` when no font can be loaded; labels are then skipped.
pub fn load_font(configured: Option<&Path>) -> Option<FontVec> {
    if let Some(path) = configured {
        match std::fs::read(path).map(FontVec::try_from_vec) {
            Ok(Ok(font)) => {
                info!("Loaded font: {}", path.display());
                return Some(font);
            }
            Ok(Err(_)) => warn!("Failed to parse font file: {}", path.display()),
            Err(e) => warn!("Failed to read font file {}: {e}", path.display()),
        }
    }

    for path in SYSTEM_FONTS {
        if let Ok(data) = std::fs::read(path)
            && let Ok(font) = FontVec::try_from_vec(data)
        {
            debug!("Loaded system font: {path}");
            return Some(font);
        }
    }

    debug!("No font found, annotation labels will be skipped");
    None
}

/// Draws detection boxes and their labels onto images.
pub struct Annotator {
    font: Option<FontVec>,
    style: DrawStyle,
}

impl Annotator {
    /// Create an annotator; `font` may be `None` to draw boxes only.
    pub const fn new(font: Option<FontVec>, style: DrawStyle) -> Self {
        Self { font, style }
    }

    /// Whether labels will be rendered.
    pub const fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw one box with its label in the top-left corner.
    pub fn annotate(&self, image: &mut RgbImage, bbox: &BoundingBox, class: DetectorClass, label: &str) {
        let color = class_color(class);
        self.draw_box(image, bbox, color);
        self.draw_label(image, bbox, color, label);
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn draw_box(&self, image: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
        let Some(rect) = bbox_rect(bbox) else {
            return;
        };

        for offset in 0..self.style.box_thickness {
            let inset = offset as i32;
            let width = rect.width().saturating_sub(2 * offset);
            let height = rect.height().saturating_sub(2 * offset);
            if width == 0 || height == 0 {
                break;
            }
            let inner = Rect::at(rect.left() + inset, rect.top() + inset).of_size(width, height);
            draw_hollow_rect_mut(image, inner, color);
        }
    }

    #[allow(clippy::cast_possible_wrap)]
    fn draw_label(&self, image: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>, label: &str) {
        let Some(font) = &self.font else {
            return;
        };
        if label.is_empty() {
            return;
        }

        let scale = self.style.label_scale;
        let (text_width, text_height) = text_size(scale, font, label);
        let box_width = text_width + 2 * LABEL_PADDING;
        let box_height = text_height + 2 * LABEL_PADDING;

        // Above the box when there is room, otherwise inside its top edge.
        let x = bbox.x_min.max(0);
        let y = if bbox.y_min >= box_height as i32 {
            bbox.y_min - box_height as i32
        } else {
            bbox.y_min.max(0)
        };

        draw_filled_rect_mut(image, Rect::at(x, y).of_size(box_width, box_height), color);
        draw_text_mut(
            image,
            TEXT_COLOR,
            x + LABEL_PADDING as i32,
            y + LABEL_PADDING as i32,
            scale,
            font,
            label,
        );
    }
}

const fn class_color(class: DetectorClass) -> Rgb<u8> {
    match class {
        DetectorClass::Animal => ANIMAL_COLOR,
        DetectorClass::Person => PERSON_COLOR,
        DetectorClass::Vehicle => VEHICLE_COLOR,
        DetectorClass::Empty | DetectorClass::Other(_) => OTHER_COLOR,
    }
}

#[allow(clippy::cast_sign_loss)]
fn bbox_rect(bbox: &BoundingBox) -> Option<Rect> {
    let width = bbox.width();
    let height = bbox.height();
    if width <= 0 || height <= 0 {
        return None;
    }
    Some(Rect::at(bbox.x_min, bbox.y_min).of_size(width as u32, height as u32))
}
