//! Visualization pass: annotated overlays and per-species crops.

use crate::config::Thresholds;
use crate::constants::visualize::UNKNOWN_FOLDER;
use crate::error::{Error, Result};
use crate::imaging::{Annotator, crop_to_bbox, open_rgb, save_image};
use crate::output::progress;
use crate::passes::{ImageOutcome, PassSummary, SkipReason};
use crate::store::{self, DetectionRecord, DetectorClass, ImageGroup};
use image::RgbImage;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static NON_WORD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\W+").ok());

/// Label drawn next to a detection box.
pub fn annotation_label(record: &DetectionRecord, thresholds: &Thresholds) -> String {
    match (record.class, record.species()) {
        (DetectorClass::Animal, Some(species))
            if thresholds.is_confident(record.classification_confidence) =>
        {
            format!("{species} {:.2}", record.classification_confidence)
        }
        (DetectorClass::Animal, Some(species)) => {
            let genus = species.split_whitespace().next().unwrap_or(species);
            format!("Unknown ({genus}) {:.2}", record.classification_confidence)
        }
        (DetectorClass::Animal, None) => format!("Animal {:.2}", record.detection_confidence),
        (class, _) => format!("{} {:.2}", class.display_name(), record.detection_confidence),
    }
}

/// Crop folder for a class-0 row: the trusted species or `unknown`, sanitized.
pub fn crop_folder_name(record: &DetectionRecord, thresholds: &Thresholds) -> String {
    let name = record
        .species()
        .filter(|_| thresholds.is_confident(record.classification_confidence))
        .unwrap_or(UNKNOWN_FOLDER);
    let folder = sanitize_folder(name);
    if folder.is_empty() {
        UNKNOWN_FOLDER.to_string()
    } else {
        folder
    }
}

/// Collapse runs of non-word characters to `_`, trim `_`, lower-case.
pub fn sanitize_folder(name: &str) -> String {
    let replaced = NON_WORD
        .as_ref()
        .map_or_else(|| name.to_string(), |re| re.replace_all(name, "_").into_owned());
    replaced.trim_matches('_').to_lowercase()
}

/// Output directories of the pass.
#[derive(Debug, Clone, Copy)]
pub struct VisualizeTargets<'a> {
    /// Annotated copies, under the original file names.
    pub annotated_dir: &'a Path,
    /// Root of the per-species crop folders.
    pub crop_dir: &'a Path,
}

/// Draw every non-sentinel detection and save animal crops.
pub fn run(
    input_dir: &Path,
    store_path: &Path,
    targets: VisualizeTargets<'_>,
    thresholds: &Thresholds,
    annotator: &Annotator,
    show_progress: bool,
) -> Result<PassSummary> {
    let loaded = store::load(store_path)?.require_records()?;
    loaded.warn_rejected();
    let records = loaded.records;

    std::fs::create_dir_all(targets.annotated_dir).map_err(|e| Error::OutputDirCreateFailed {
        path: targets.annotated_dir.to_path_buf(),
        source: e,
    })?;

    let groups: Vec<ImageGroup> = store::group_by_image(&records)
        .into_iter()
        .filter(|g| g.records(&records).any(|r| !r.class.is_sentinel()))
        .collect();

    if !annotator.has_font() {
        debug!("No font loaded; drawing boxes without labels");
    }

    info!("Annotating {} image(s)", groups.len());
    let pb = progress::create_pass_progress(groups.len(), "visualize", show_progress);
    let mut summary = PassSummary::new("visualize");

    for group in &groups {
        let outcome = visualize_group(
            input_dir,
            group,
            &records,
            targets,
            thresholds,
            annotator,
            &mut summary,
        );
        summary.record(&outcome);
        progress::inc_progress(pb.as_ref());
    }

    progress::finish_progress(pb, "Visualization complete");
    summary.log();
    Ok(summary)
}

fn visualize_group(
    input_dir: &Path,
    group: &ImageGroup,
    records: &[DetectionRecord],
    targets: VisualizeTargets<'_>,
    thresholds: &Thresholds,
    annotator: &Annotator,
    summary: &mut PassSummary,
) -> ImageOutcome {
    let path = input_dir.join(&group.image_filename);
    if !path.is_file() {
        debug!("Image not found: {}", path.display());
        return ImageOutcome::Skipped(SkipReason::MissingImage);
    }

    let source = match open_rgb(&path) {
        Ok(image) => image,
        Err(e) => {
            warn!("Could not read {}: {e}", path.display());
            return ImageOutcome::Skipped(SkipReason::UnreadableImage(e.to_string()));
        }
    };

    let stem = Path::new(&group.image_filename)
        .file_stem()
        .map_or_else(|| group.image_filename.clone(), |s| s.to_string_lossy().into_owned());

    let mut annotated = source.clone();

    for record in group.records(records).filter(|r| !r.class.is_sentinel()) {
        let label = annotation_label(record, thresholds);
        annotator.annotate(&mut annotated, &record.bbox, record.class, &label);
        summary.rows_affected += 1;

        if record.class == DetectorClass::Animal
            && let Err(reason) = save_crop(&source, record, &stem, targets.crop_dir, thresholds)
        {
            warn!(
                "{} detection {}: {reason}",
                record.image_filename, record.detection_index
            );
            summary.rows_skipped += 1;
        }
    }

    let dest = targets.annotated_dir.join(&group.image_filename);
    match save_image(&annotated, &dest) {
        Ok(()) => ImageOutcome::Processed,
        Err(e) => {
            warn!("Failed to save {}: {e}", dest.display());
            ImageOutcome::Skipped(SkipReason::WriteFailed(e.to_string()))
        }
    }
}

fn save_crop(
    source: &RgbImage,
    record: &DetectionRecord,
    stem: &str,
    crop_dir: &Path,
    thresholds: &Thresholds,
) -> std::result::Result<(), SkipReason> {
    let crop = crop_to_bbox(source, &record.bbox).ok_or(SkipReason::EmptyCrop)?;

    let folder = crop_dir.join(crop_folder_name(record, thresholds));
    std::fs::create_dir_all(&folder).map_err(|e| SkipReason::WriteFailed(e.to_string()))?;

    let dest = folder.join(format!("{stem}_crop_{}.jpg", record.detection_index));
    save_image(&crop, &dest).map_err(|e| SkipReason::WriteFailed(e.to_string()))
}
