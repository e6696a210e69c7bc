//! Sort pass: copy images into `empty/` and `non-empty/`.

use crate::config::Thresholds;
use crate::constants::sort::{EMPTY_DIR, NON_EMPTY_DIR};
use crate::error::{Error, Result};
use crate::output::progress;
use crate::passes::{ImageOutcome, PassSummary, SkipReason};
use crate::store::{self, DetectionRecord};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Images split by whether they contain a confident detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortPartition {
    /// Images with at least one confident non-sentinel row.
    pub non_empty: Vec<String>,
    /// Every other image in the store.
    pub empty: Vec<String>,
}

/// Result of a sort run.
#[derive(Debug, Clone)]
pub struct SortReport {
    /// The computed partition.
    pub partition: SortPartition,
    /// Counters.
    pub summary: PassSummary,
}

/// Partition images, in order of first appearance.
pub fn partition(records: &[DetectionRecord], thresholds: &Thresholds) -> SortPartition {
    let non_empty: HashSet<&str> = records
        .iter()
        .filter(|r| !r.class.is_sentinel() && r.detection_confidence > thresholds.detection_floor)
        .map(|r| r.image_filename.as_str())
        .collect();

    let mut result = SortPartition::default();
    for group in store::group_by_image(records) {
        if non_empty.contains(group.image_filename.as_str()) {
            result.non_empty.push(group.image_filename);
        } else {
            result.empty.push(group.image_filename);
        }
    }
    result
}

/// Copy every image in the store into `<output_dir>/non-empty` or `<output_dir>/empty`.
pub fn run(
    input_dir: &Path,
    store_path: &Path,
    output_dir: &Path,
    thresholds: &Thresholds,
    show_progress: bool,
) -> Result<SortReport> {
    let loaded = store::load(store_path)?.require_records()?;
    loaded.warn_rejected();

    let partition = partition(&loaded.records, thresholds);

    let non_empty_dir = output_dir.join(NON_EMPTY_DIR);
    let empty_dir = output_dir.join(EMPTY_DIR);
    for dir in [&non_empty_dir, &empty_dir] {
        fs::create_dir_all(dir).map_err(|e| Error::OutputDirCreateFailed {
            path: dir.clone(),
            source: e,
        })?;
    }

    let total = partition.non_empty.len() + partition.empty.len();
    let pb = progress::create_pass_progress(total, "sort", show_progress);
    let mut summary = PassSummary::new("sort");

    let targets = partition
        .non_empty
        .iter()
        .map(|name| (name, &non_empty_dir))
        .chain(partition.empty.iter().map(|name| (name, &empty_dir)));

    for (name, dest_dir) in targets {
        let outcome = copy_image(&input_dir.join(name), &dest_dir.join(name));
        if outcome == ImageOutcome::Processed {
            summary.rows_affected += 1;
        }
        summary.record(&outcome);
        progress::inc_progress(pb.as_ref());
    }

    progress::finish_progress(pb, "Sorting complete");

    info!(
        "Non-empty: {} | Empty: {}",
        partition.non_empty.len(),
        partition.empty.len()
    );
    summary.log();

    Ok(SortReport { partition, summary })
}

fn copy_image(source: &Path, dest: &Path) -> ImageOutcome {
    if !source.is_file() {
        warn!("Source file not found: {}", source.display());
        return ImageOutcome::Skipped(SkipReason::MissingImage);
    }

    match fs::copy(source, dest) {
        Ok(_) => ImageOutcome::Processed,
        Err(e) => {
            warn!("Failed to copy {} to {}: {e}", source.display(), dest.display());
            ImageOutcome::Skipped(SkipReason::WriteFailed(e.to_string()))
        }
    }
}
