//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "camtrap";

/// Classification confidence above which a predicted species is trusted.
///
/// Shared by annotation labels and crop folder selection.
pub const DEFAULT_CLASSIFICATION_THRESHOLD: f64 = 0.8;

/// Detection confidence above which a non-sentinel row makes an image non-empty.
pub const DEFAULT_DETECTION_FLOOR: f64 = 0.1;

/// Lock file extension appended to the store file name.
pub const LOCK_FILE_EXTENSION: &str = ".lock";

/// Age after which a lock file is considered abandoned.
pub const STALE_LOCK_AGE: std::time::Duration = std::time::Duration::from_secs(6 * 60 * 60);

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "CAMTRAP_CONFIG";

/// Config file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Extension of the temporary file a store rewrite goes through.
pub const STORE_TEMP_EXTENSION: &str = ".tmp";

/// Image file extension picked up by the detection pass.
pub const IMAGE_EXTENSION: &str = "jpg";

/// Detector class ids and their display names.
pub mod detector_class {
    /// Placeholder class for an image with no detections.
    pub const EMPTY: i32 = -1;
    /// Animal (or unknown object) class.
    pub const ANIMAL: i32 = 0;
    /// Person class.
    pub const PERSON: i32 = 1;
    /// Vehicle class.
    pub const VEHICLE: i32 = 2;

    /// Species value written on sentinel rows.
    pub const SENTINEL_SPECIES: &str = "empty";
}

/// Column header names of the detection log.
pub mod columns {
    /// Image file name (join key).
    pub const IMAGE_FILENAME: &str = "Image_Filename";
    /// Rank of the detection within its image.
    pub const DETECTION_INDEX: &str = "Detection_Index";
    /// Image width in pixels.
    pub const IMAGE_WIDTH: &str = "Image_Width";
    /// Image height in pixels.
    pub const IMAGE_HEIGHT: &str = "Image_Height";
    /// EXIF original capture time.
    pub const TIMESTAMP: &str = "Timestamp";
    /// Detector class id.
    pub const CLASS_ID: &str = "MD_Class_ID";
    /// Detector confidence.
    pub const DETECTION_CONFIDENCE: &str = "MD_Confidence";
    /// Bounding box left edge.
    pub const X_MIN: &str = "X_min";
    /// Bounding box top edge.
    pub const Y_MIN: &str = "Y_min";
    /// Bounding box right edge.
    pub const X_MAX: &str = "X_max";
    /// Bounding box bottom edge.
    pub const Y_MAX: &str = "Y_max";
    /// Predicted species label.
    pub const PREDICTED_SPECIES: &str = "Predicted_Species";
    /// Classifier confidence.
    pub const CLASSIFICATION_CONFIDENCE: &str = "Classification_Confidence";
}

/// Default paths used by the `run` command.
pub mod defaults {
    /// Master detection log.
    pub const STORE: &str = "data/main_detection_log.csv";
    /// Exported JSON document.
    pub const JSON: &str = "data/analyzed_data.json";
    /// Parent of the `empty`/`non-empty` folders.
    pub const SORTED: &str = "output/sorted_images";
    /// Annotated images.
    pub const ANNOTATED: &str = "output/annotated_images";
    /// Species crop folders.
    pub const CROPS: &str = "output/cropped_crops_by_species";
}

/// Sort pass output folder names.
pub mod sort {
    /// Images with at least one confident detection.
    pub const NON_EMPTY_DIR: &str = "non-empty";
    /// Images without one.
    pub const EMPTY_DIR: &str = "empty";
}

/// Visualization constants.
pub mod visualize {
    /// Crop folder used when the species is not trusted.
    pub const UNKNOWN_FOLDER: &str = "unknown";
    /// Default bounding box line thickness in pixels.
    pub const DEFAULT_BOX_THICKNESS: u32 = 4;
    /// Default label font size in pixels.
    pub const DEFAULT_LABEL_SCALE: f32 = 24.0;
    /// Padding around label text in pixels.
    pub const LABEL_PADDING: u32 = 4;
    /// Fonts tried when none is configured.
    pub const SYSTEM_FONTS: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];
}

/// Export pass constants.
pub mod export {
    /// Species values never exported (compared case-insensitively).
    pub const EXCLUDED_SPECIES: &[&str] = &["unknown", "none"];
    /// JSON indentation.
    pub const INDENT: &[u8] = b"    ";
}

/// Inference defaults.
pub mod inference {
    /// MegaDetector v6 input resolution.
    pub const DETECTOR_INPUT_SIZE: u32 = 1280;
    /// Detector rows below this score are discarded by the backend.
    pub const DETECTOR_MIN_CONFIDENCE: f32 = 0.2;
    /// Classifier input resolution.
    pub const CLASSIFIER_INPUT_SIZE: u32 = 224;
    /// Values per row of an end-to-end YOLO output (x1, y1, x2, y2, score, class).
    pub const DETECTION_ROW_LEN: usize = 6;
    /// ImageNet channel means.
    pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
    /// ImageNet channel standard deviations.
    pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
}

/// LILA Snapshot Serengeti download constants.
pub mod fetch {
    /// Blob container with the unzipped images.
    pub const BASE_URL: &str =
        "https://lilawildlife.blob.core.windows.net/lila-wildlife/snapshotserengeti-unzipped/";
    /// Default season filter.
    pub const DEFAULT_SEASON: &str = "SER_S5#";
    /// Default number of captures to fetch.
    pub const DEFAULT_LIMIT: i64 = 1000;
    /// Default download folder.
    pub const DEFAULT_OUTPUT_DIR: &str = "raw_captures";
    /// Capture id column.
    pub const CAPTURE_ID_COLUMN: &str = "capture_id";
    /// Relative image path column.
    pub const PATH_COLUMN: &str = "image_path_rel";
}
