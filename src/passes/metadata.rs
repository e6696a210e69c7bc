//! Metadata pass: image dimensions and capture time.

use crate::error::Result;
use crate::imaging::read_image_info;
use crate::output::progress;
use crate::passes::{ImageOutcome, PassSummary, SkipReason, lock_existing};
use crate::store::{self, ColumnOrder, DetectionRecord, ImageGroup};
use std::path::Path;
use tracing::{debug, info, warn};

/// Fill width, height and timestamp for every row, reading each image once.
pub fn run(
    input_dir: &Path,
    store_path: &Path,
    order: &ColumnOrder,
    show_progress: bool,
) -> Result<PassSummary> {
    let _lock = lock_existing(store_path)?;

    let loaded = store::load(store_path)?.require_records()?;
    loaded.require_clean()?;
    let mut records = loaded.records;

    let groups = store::group_by_image(&records);
    info!("Extracting metadata for {} image(s)", groups.len());
    let pb = progress::create_pass_progress(groups.len(), "metadata", show_progress);

    let mut summary = PassSummary::new("metadata");

    for group in &groups {
        let outcome = annotate_group(input_dir, group, &mut records);
        if let ImageOutcome::Processed = outcome {
            summary.rows_affected += group.rows.len();
        }
        summary.record(&outcome);
        progress::inc_progress(pb.as_ref());
    }

    progress::finish_progress(pb, "Metadata complete");

    store::save(store_path, &records, order)?;
    summary.log();
    Ok(summary)
}

fn annotate_group(
    input_dir: &Path,
    group: &ImageGroup,
    records: &mut [DetectionRecord],
) -> ImageOutcome {
    let path = input_dir.join(&group.image_filename);
    if !path.is_file() {
        warn!("Image not found: {}. Skipping", path.display());
        return ImageOutcome::Skipped(SkipReason::MissingImage);
    }

    let info = match read_image_info(&path) {
        Ok(info) => info,
        Err(e) => {
            warn!("Could not read {}: {e}. Skipping", path.display());
            return ImageOutcome::Skipped(SkipReason::UnreadableImage(e.to_string()));
        }
    };

    debug!(
        "{}: {}x{}, timestamp {:?}",
        group.image_filename, info.width, info.height, info.timestamp
    );

    for &row in &group.rows {
        let record = &mut records[row];
        record.image_width = Some(info.width);
        record.image_height = Some(info.height);
        record.timestamp.clone_from(&info.timestamp);
    }

    ImageOutcome::Processed
}
