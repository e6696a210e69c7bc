//! Download a Snapshot Serengeti season sample from LILA.

mod download;
mod lila;

pub use download::{download_file, http_client, partial_path};
pub use lila::{ImageRef, collect_captures, image_refs};

use crate::error::{Error, Result};
use crate::output::progress;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};

/// What to fetch and where.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Annotations CSV (one row per classification, `capture_id` column).
    pub annotations: PathBuf,
    /// Images CSV (`capture_id`, `image_path_rel` columns).
    pub images: PathBuf,
    /// Substring a capture id must contain, e.g. `SER_S5#`.
    pub season: String,
    /// Maximum captures; negative for all.
    pub limit: i64,
    /// Download folder.
    pub output_dir: PathBuf,
    /// Whether to show a progress bar.
    pub show_progress: bool,
}

/// Counters for a fetch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Captures selected from the annotations.
    pub captures: usize,
    /// Files downloaded in this run.
    pub downloaded: usize,
    /// Captures already present on disk.
    pub existing: usize,
    /// Failed downloads.
    pub failed: usize,
}

/// Select captures and download one image for each, skipping files already present.
pub async fn fetch(options: &FetchOptions) -> Result<FetchSummary> {
    let season_label = options.season.trim_matches('#');
    info!("Collecting capture ids (season: {season_label})");

    let captures = collect_captures(&options.annotations, &options.season, options.limit)?;
    let mut summary = FetchSummary {
        captures: captures.len(),
        ..FetchSummary::default()
    };

    if captures.is_empty() {
        info!("No matching captures found for season {season_label}");
        return Ok(summary);
    }

    std::fs::create_dir_all(&options.output_dir).map_err(|e| Error::OutputDirCreateFailed {
        path: options.output_dir.clone(),
        source: e,
    })?;

    let client = http_client()?;
    let targets: HashSet<String> = captures.into_iter().collect();
    let mut pending = targets.clone();
    let pb = progress::create_pass_progress(targets.len(), "fetch", options.show_progress);

    info!("Downloading images for {} capture(s)", targets.len());

    for image in image_refs(&options.images, &targets)? {
        let image = image?;
        if !pending.contains(&image.capture_id) {
            continue;
        }

        let dest = image.destination(&options.output_dir);
        if dest.exists() {
            pending.remove(&image.capture_id);
            summary.existing += 1;
            progress::inc_progress(pb.as_ref());
        } else {
            let url = image.url();
            match download_file(&client, &url, &dest).await {
                Ok(_) => {
                    pending.remove(&image.capture_id);
                    summary.downloaded += 1;
                    progress::inc_progress(pb.as_ref());
                }
                Err(e) => {
                    warn!("{e}");
                    summary.failed += 1;
                }
            }
        }

        if pending.is_empty() {
            break;
        }
    }

    progress::finish_progress(pb, "Download complete");

    let limit = if options.limit < 0 {
        "all".to_string()
    } else {
        options.limit.to_string()
    };
    info!(
        "Download complete: limit {limit}, season {season_label}, {} new file(s), {} already present, {} failed",
        summary.downloaded, summary.existing, summary.failed
    );
    if !pending.is_empty() {
        warn!("{} capture(s) have no downloaded image", pending.len());
    }

    Ok(summary)
}
