//! Classification pass: species predictions for animal rows.

use crate::error::Result;
use crate::imaging::{crop_to_bbox, open_rgb};
use crate::inference::SpeciesClassifier;
use crate::output::progress;
use crate::passes::{ImageOutcome, PassSummary, SkipReason, lock_existing};
use crate::store::{self, ColumnOrder, DetectionRecord, DetectorClass, ImageGroup};
use std::path::Path;
use tracing::{debug, info, warn};

/// Classify every class-0 row and rewrite the store.
///
/// Rows of any other class are left untouched.
pub fn run(
    input_dir: &Path,
    store_path: &Path,
    order: &ColumnOrder,
    classifier: &mut dyn SpeciesClassifier,
    show_progress: bool,
) -> Result<PassSummary> {
    let _lock = lock_existing(store_path)?;

    let loaded = store::load(store_path)?.require_records()?;
    loaded.require_clean()?;
    let mut records = loaded.records;

    let groups: Vec<ImageGroup> = store::group_by_image(&records)
        .into_iter()
        .filter(|g| g.records(&records).any(|r| r.class == DetectorClass::Animal))
        .collect();

    info!("Classifying animals in {} image(s)", groups.len());
    let pb = progress::create_pass_progress(groups.len(), "classify", show_progress);

    let mut summary = PassSummary::new("classify");

    for group in &groups {
        let outcome = classify_group(input_dir, group, &mut records, classifier, &mut summary);
        summary.record(&outcome);
        progress::inc_progress(pb.as_ref());
    }

    progress::finish_progress(pb, "Classification complete");

    store::save(store_path, &records, order)?;
    summary.log();
    Ok(summary)
}

fn classify_group(
    input_dir: &Path,
    group: &ImageGroup,
    records: &mut [DetectionRecord],
    classifier: &mut dyn SpeciesClassifier,
    summary: &mut PassSummary,
) -> ImageOutcome {
    let path = input_dir.join(&group.image_filename);
    if !path.is_file() {
        warn!("Image not found for classification: {}. Skipping", path.display());
        return ImageOutcome::Skipped(SkipReason::MissingImage);
    }

    let image = match open_rgb(&path) {
        Ok(image) => image,
        Err(e) => {
            warn!("Could not read {}: {e}. Skipping", path.display());
            return ImageOutcome::Skipped(SkipReason::UnreadableImage(e.to_string()));
        }
    };

    for &row in &group.rows {
        let record = &mut records[row];
        if record.class != DetectorClass::Animal {
            continue;
        }

        let Some(crop) = crop_to_bbox(&image, &record.bbox) else {
            warn!(
                "{} detection {}: {}",
                record.image_filename,
                record.detection_index,
                SkipReason::EmptyCrop
            );
            summary.rows_skipped += 1;
            continue;
        };

        match classifier.classify(&crop) {
            Ok(prediction) => {
                debug!(
                    "{} detection {}: {} ({:.3})",
                    record.image_filename, record.detection_index, prediction.label, prediction.confidence
                );
                record.predicted_species = Some(prediction.label);
                record.classification_confidence = f64::from(prediction.confidence);
                summary.rows_affected += 1;
            }
            Err(e) => {
                warn!(
                    "{} detection {}: {}",
                    record.image_filename,
                    record.detection_index,
                    SkipReason::ClassifierFailed(e.to_string())
                );
                summary.rows_skipped += 1;
            }
        }
    }

    ImageOutcome::Processed
}
