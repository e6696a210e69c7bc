//! Export pass: per-image JSON document of classified animals.

use crate::constants::export::{EXCLUDED_SPECIES, INDENT};
use crate::error::{Error, Result};
use crate::passes::{ImageOutcome, PassSummary};
use crate::store::{self, DetectionRecord, DetectorClass};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// One exported image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageEntry {
    /// Source image file name.
    pub file_name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// EXIF capture time, or `""`.
    pub datetime_original: String,
    /// Classified animal detections.
    pub annotations: Vec<Annotation>,
}

/// One classified animal detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    /// Detection index within the image.
    pub detection_id: u32,
    /// Predicted species (trimmed).
    pub category: String,
    /// Classification confidence.
    pub confidence: f64,
    /// `[x_min, y_min, width, height]`.
    pub bbox: [i32; 4],
}

/// Whether `species` is a real classification rather than a placeholder.
pub fn is_exportable_species(species: &str) -> bool {
    let trimmed = species.trim();
    !trimmed.is_empty()
        && !EXCLUDED_SPECIES
            .iter()
            .any(|excluded| trimmed.eq_ignore_ascii_case(excluded))
}

fn annotation(record: &DetectionRecord) -> Option<Annotation> {
    if record.class != DetectorClass::Animal {
        return None;
    }
    let species = record.predicted_species.as_deref()?;
    if !is_exportable_species(species) {
        return None;
    }

    Some(Annotation {
        detection_id: record.detection_index,
        category: species.trim().to_string(),
        confidence: record.classification_confidence,
        bbox: record.bbox.to_xywh(),
    })
}

/// Build the export document from loaded records.
///
/// Images whose first row lacks dimensions, or that end up with no
/// annotations, are omitted.
pub fn build_document(records: &[DetectionRecord]) -> Vec<ImageEntry> {
    store::group_by_image(records)
        .iter()
        .filter_map(|group| {
            let first = group.first(records)?;
            let (Some(width), Some(height)) = (first.image_width, first.image_height) else {
                debug!("{}: no metadata, not exported", group.image_filename);
                return None;
            };

            let annotations: Vec<Annotation> =
                group.records(records).filter_map(annotation).collect();
            if annotations.is_empty() {
                return None;
            }

            Some(ImageEntry {
                file_name: group.image_filename.clone(),
                width,
                height,
                datetime_original: first.timestamp.clone().unwrap_or_default(),
                annotations,
            })
        })
        .collect()
}

/// Write `entries` as a JSON array indented by four spaces.
pub fn write_document(path: &Path, entries: &[ImageEntry]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OutputDirCreateFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(INDENT));
    entries
        .serialize(&mut serializer)
        .map_err(|e| Error::JsonWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    writer.flush()?;
    Ok(())
}

/// Export the store at `store_path` to `output_path`.
pub fn run(store_path: &Path, output_path: &Path) -> Result<PassSummary> {
    let loaded = store::load(store_path)?.require_records()?;
    loaded.warn_rejected();

    let entries = build_document(&loaded.records);
    write_document(output_path, &entries)?;

    let mut summary = PassSummary::new("export");
    for entry in &entries {
        summary.record(&ImageOutcome::Processed);
        summary.rows_affected += entry.annotations.len();
    }

    info!(
        "Exported data for {} classified image(s) to {}",
        entries.len(),
        output_path.display()
    );
    summary.log();
    Ok(summary)
}
