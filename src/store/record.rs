//! Detection log record type.

use crate::constants::detector_class;

/// Detector class of a row.
///
/// Ids outside the known domain are carried verbatim so a rewrite never
/// changes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorClass {
    /// Placeholder row for an image with no detections (`-1`).
    Empty,
    /// Animal or unknown object (`0`).
    Animal,
    /// Person (`1`).
    Person,
    /// Vehicle (`2`).
    Vehicle,
    /// Any other id the detector produced.
    Other(i32),
}

impl DetectorClass {
    /// Map a raw detector id to a class.
    pub const fn from_id(id: i32) -> Self {
        match id {
            detector_class::EMPTY => Self::Empty,
            detector_class::ANIMAL => Self::Animal,
            detector_class::PERSON => Self::Person,
            detector_class::VEHICLE => Self::Vehicle,
            other => Self::Other(other),
        }
    }

    /// The raw id persisted in the log.
    pub const fn id(self) -> i32 {
        match self {
            Self::Empty => detector_class::EMPTY,
            Self::Animal => detector_class::ANIMAL,
            Self::Person => detector_class::PERSON,
            Self::Vehicle => detector_class::VEHICLE,
            Self::Other(id) => id,
        }
    }

    /// Label prefix used for non-animal annotations.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Vehicle => "Vehicle",
            _ => "Object",
        }
    }

    /// Whether this is the "no detection" placeholder.
    pub const fn is_sentinel(self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Pixel bounding box in corner form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundingBox {
    /// Left edge.
    pub x_min: i32,
    /// Top edge.
    pub y_min: i32,
    /// Right edge.
    pub x_max: i32,
    /// Bottom edge.
    pub y_max: i32,
}

impl BoundingBox {
    /// Build from detector coordinates, truncating toward zero.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_xyxy(xyxy: [f32; 4]) -> Self {
        Self {
            x_min: xyxy[0] as i32,
            y_min: xyxy[1] as i32,
            x_max: xyxy[2] as i32,
            y_max: xyxy[3] as i32,
        }
    }

    /// Box width (may be negative for a malformed box).
    pub const fn width(&self) -> i32 {
        self.x_max - self.x_min
    }

    /// Box height (may be negative for a malformed box).
    pub const fn height(&self) -> i32 {
        self.y_max - self.y_min
    }

    /// `[x_min, y_min, width, height]` form used by the export document.
    pub const fn to_xywh(&self) -> [i32; 4] {
        [self.x_min, self.y_min, self.width(), self.height()]
    }
}

/// One row of the master detection log.
///
/// Fields owned by later passes start unset and are filled exactly once:
/// dimensions and timestamp by the metadata pass, species and
/// classification confidence by the classification pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    /// Source image file name; the join key across passes.
    pub image_filename: String,
    /// Rank of this detection within its image.
    pub detection_index: u32,
    /// Image width in pixels.
    pub image_width: Option<u32>,
    /// Image height in pixels.
    pub image_height: Option<u32>,
    /// EXIF original capture time, verbatim.
    pub timestamp: Option<String>,
    /// Detector class.
    pub class: DetectorClass,
    /// Detector confidence.
    pub detection_confidence: f64,
    /// Detection box.
    pub bbox: BoundingBox,
    /// Predicted species.
    pub predicted_species: Option<String>,
    /// Classifier confidence.
    pub classification_confidence: f64,
}

impl DetectionRecord {
    /// An unpopulated record, the starting point when decoding a row.
    pub(crate) fn blank() -> Self {
        Self {
            image_filename: String::new(),
            detection_index: 0,
            image_width: None,
            image_height: None,
            timestamp: None,
            class: DetectorClass::Empty,
            detection_confidence: 0.0,
            bbox: BoundingBox::default(),
            predicted_species: None,
            classification_confidence: 0.0,
        }
    }

    /// Placeholder row for an image the detector found nothing in.
    pub fn sentinel(image_filename: impl Into<String>) -> Self {
        Self {
            image_filename: image_filename.into(),
            predicted_species: Some(detector_class::SENTINEL_SPECIES.to_string()),
            ..Self::blank()
        }
    }

    /// Row for a single detector hit.
    pub fn detection(
        image_filename: impl Into<String>,
        detection_index: u32,
        class: DetectorClass,
        detection_confidence: f64,
        bbox: BoundingBox,
    ) -> Self {
        Self {
            image_filename: image_filename.into(),
            detection_index,
            class,
            detection_confidence,
            bbox,
            ..Self::blank()
        }
    }

    /// Row identity, stable across passes.
    pub fn key(&self) -> (&str, u32) {
        (&self.image_filename, self.detection_index)
    }

    /// Whether the metadata pass has filled in the image size.
    pub const fn has_metadata(&self) -> bool {
        self.image_width.is_some() && self.image_height.is_some()
    }

    /// Predicted species, if set and non-blank.
    pub fn species(&self) -> Option<&str> {
        self.predicted_species
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}
