//! Image dimensions and EXIF capture time.

use crate::error::{Error, Result};
use exif::{In, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Intrinsic properties of an image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// EXIF `DateTimeOriginal`, verbatim.
    pub timestamp: Option<String>,
}

/// Read the image size from its header and the EXIF capture time.
///
/// Fails only when the image itself cannot be read; a missing or
/// unreadable EXIF block yields `timestamp: None`.
pub fn read_image_info(path: &Path) -> Result<ImageInfo> {
    let (width, height) = image::image_dimensions(path).map_err(|e| Error::Image {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(ImageInfo {
        width,
        height,
        timestamp: capture_time(path),
    })
}

/// EXIF `DateTimeOriginal` as stored (e.g. `2016:07:11 06:32:10`).
pub fn capture_time(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);

    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("No EXIF data in {}: {e}", path.display());
            return None;
        }
    };

    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(values) => values
            .first()
            .map(|raw| String::from_utf8_lossy(raw).trim_end_matches('\0').to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}
