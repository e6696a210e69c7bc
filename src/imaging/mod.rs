//! Image helpers: header info, EXIF capture time, crops and annotation drawing.

mod crop;
mod draw;
mod image_info;

pub use crop::crop_to_bbox;
pub use draw::{Annotator, DrawStyle, load_font};
pub use image_info::{ImageInfo, capture_time, read_image_info};

use crate::error::{Error, Result};
use image::RgbImage;
use std::path::Path;

/// Open an image and convert it to 8-bit RGB.
pub fn open_rgb(path: &Path) -> Result<RgbImage> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|e| Error::Image {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Save an image, inferring the format from the path's extension.
pub fn save_image(image: &RgbImage, path: &Path) -> Result<()> {
    image.save(path).map_err(|e| Error::Image {
        path: path.to_path_buf(),
        source: e,
    })
}
