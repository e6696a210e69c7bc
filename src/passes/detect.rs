//! Detection pass: builds a fresh detection log from detector output.

use crate::constants::IMAGE_EXTENSION;
use crate::error::{Error, Result};
use crate::inference::{Detector, RawDetection};
use crate::locking::StoreLock;
use crate::output::progress;
use crate::passes::{ImageOutcome, PassSummary, SkipReason};
use crate::store::{self, BoundingBox, ColumnOrder, DetectionRecord, DetectorClass};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// List `*.jpg` files in `dir` (extension compared case-insensitively), sorted by name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InputDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(IMAGE_EXTENSION))
        })
        .collect();

    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

/// Convert one image's detector output into log rows.
///
/// No detections yields a single sentinel row.
pub fn records_for_image(image_filename: &str, detections: &[RawDetection]) -> Vec<DetectionRecord> {
    if detections.is_empty() {
        return vec![DetectionRecord::sentinel(image_filename)];
    }

    detections
        .iter()
        .zip(0u32..)
        .map(|(detection, index)| {
            DetectionRecord::detection(
                image_filename,
                index,
                DetectorClass::from_id(detection.class_id),
                f64::from(detection.confidence),
                BoundingBox::from_xyxy(detection.bbox),
            )
        })
        .collect()
}

/// Run the detector over every image in `input_dir` and write a new store.
pub fn run(
    input_dir: &Path,
    store_path: &Path,
    order: &ColumnOrder,
    detector: &mut dyn Detector,
    show_progress: bool,
) -> Result<PassSummary> {
    let images = list_images(input_dir)?;
    if images.is_empty() {
        return Err(Error::NoImagesFound {
            path: input_dir.to_path_buf(),
        });
    }

    if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OutputDirCreateFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let _lock = StoreLock::acquire(store_path)?;

    info!("Starting detection on {} image(s)", images.len());
    let pb = progress::create_pass_progress(images.len(), "detect", show_progress);

    let mut summary = PassSummary::new("detect");
    let mut records = Vec::new();

    for path in &images {
        let image_filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let outcome = match detector.detect(path) {
            Ok(detections) => {
                debug!("{image_filename}: {} detection(s)", detections.len());
                records.extend(records_for_image(&image_filename, &detections));
                ImageOutcome::Processed
            }
            Err(e) => {
                warn!("Detection failed for {}: {e}", path.display());
                ImageOutcome::Skipped(SkipReason::DetectorFailed(e.to_string()))
            }
        };

        summary.record(&outcome);
        progress::inc_progress(pb.as_ref());
    }

    progress::finish_progress(pb, "Detection complete");

    store::save(store_path, &records, order)?;
    summary.rows_affected = records.len();
    summary.log();
    Ok(summary)
}
