//! Per-image outcomes and pass summaries.

use std::fmt;
use tracing::info;

/// Why an image or row was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The image file does not exist.
    MissingImage,
    /// The image exists but could not be decoded.
    UnreadableImage(String),
    /// The detector failed on this image.
    DetectorFailed(String),
    /// The classifier failed on a crop.
    ClassifierFailed(String),
    /// The bounding box has no area inside the image.
    EmptyCrop,
    /// Copying or writing an artifact failed.
    WriteFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingImage => write!(f, "image not found"),
            Self::UnreadableImage(reason) => write!(f, "image unreadable: {reason}"),
            Self::DetectorFailed(reason) => write!(f, "detector failed: {reason}"),
            Self::ClassifierFailed(reason) => write!(f, "classifier failed: {reason}"),
            Self::EmptyCrop => write!(f, "empty crop"),
            Self::WriteFailed(reason) => write!(f, "write failed: {reason}"),
        }
    }
}

/// Result of one per-image step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// The image was handled.
    Processed,
    /// The image was skipped; the pass continues.
    Skipped(SkipReason),
}

/// Counters aggregated over a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    /// Pass name.
    pub pass: &'static str,
    /// Images handled.
    pub images_processed: usize,
    /// Images skipped.
    pub images_skipped: usize,
    /// Rows written, updated or exported.
    pub rows_affected: usize,
    /// Individual rows skipped.
    pub rows_skipped: usize,
}

impl PassSummary {
    /// Empty summary for `pass`.
    pub const fn new(pass: &'static str) -> Self {
        Self {
            pass,
            images_processed: 0,
            images_skipped: 0,
            rows_affected: 0,
            rows_skipped: 0,
        }
    }

    /// Count one image outcome.
    pub const fn record(&mut self, outcome: &ImageOutcome) {
        match outcome {
            ImageOutcome::Processed => self.images_processed += 1,
            ImageOutcome::Skipped(_) => self.images_skipped += 1,
        }
    }

    /// Log the summary at info level.
    pub fn log(&self) {
        info!("{self}");
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} complete: {} image(s) processed, {} skipped, {} row(s) affected",
            self.pass, self.images_processed, self.images_skipped, self.rows_affected
        )?;
        if self.rows_skipped > 0 {
            write!(f, ", {} row(s) skipped", self.rows_skipped)?;
        }
        Ok(())
    }
}
