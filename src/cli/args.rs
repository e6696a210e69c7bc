//! CLI argument definitions.

use crate::cli::validators::{parse_column_order, parse_stage, parse_unit};
use crate::config::{ClassifierConfig, DetectorConfig, InferenceDevice, Thresholds};
use crate::constants::fetch::{DEFAULT_LIMIT, DEFAULT_OUTPUT_DIR, DEFAULT_SEASON};
use crate::pipeline::Stage;
use crate::store::ColumnOrder;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Camera-trap image pipeline: detect, classify, sort, annotate and export.
#[derive(Debug, Parser)]
#[command(name = "camtrap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every command.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Logging and progress flags.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Only log warnings and errors; hides progress bars.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace+ORT info, -vvv: trace+ORT debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable progress bars.
    #[arg(long, global = true)]
    pub no_progress: bool,
}

impl GlobalArgs {
    /// Whether progress bars should be drawn.
    pub const fn show_progress(&self) -> bool {
        !self.quiet && !self.no_progress
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the detector over a folder and create the detection log.
    Detect {
        /// Folder of source images.
        input_dir: PathBuf,
        /// Detection log to create or replace.
        store: PathBuf,
        /// Comma-separated column order for the log.
        #[arg(value_parser = parse_column_order)]
        column_order: ColumnOrder,
        /// Detector model options.
        #[command(flatten)]
        detector: DetectorArgs,
        /// Device selection.
        #[command(flatten)]
        inference: InferenceArgs,
    },
    /// Fill image dimensions and capture times into the log.
    Metadata {
        /// Folder of source images.
        input_dir: PathBuf,
        /// Existing detection log.
        store: PathBuf,
        /// Comma-separated column order for the log.
        #[arg(value_parser = parse_column_order)]
        column_order: ColumnOrder,
    },
    /// Classify animal detections by species.
    Classify {
        /// Folder of source images.
        input_dir: PathBuf,
        /// Existing detection log.
        store: PathBuf,
        /// Comma-separated column order for the log.
        #[arg(value_parser = parse_column_order)]
        column_order: ColumnOrder,
        /// Classifier model options.
        #[command(flatten)]
        classifier: ClassifierArgs,
        /// Device selection.
        #[command(flatten)]
        inference: InferenceArgs,
    },
    /// Copy images into `empty/` and `non-empty/` folders.
    Sort {
        /// Folder of source images.
        input_dir: PathBuf,
        /// Existing detection log.
        store: PathBuf,
        /// Parent folder for the two sort folders.
        output_dir: PathBuf,
        /// Threshold overrides.
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Write annotated images and per-species crops.
    Visualize {
        /// Folder of source images.
        input_dir: PathBuf,
        /// Existing detection log.
        store: PathBuf,
        /// Folder for annotated images.
        annotated_dir: PathBuf,
        /// Parent folder for species crop folders.
        crop_dir: PathBuf,
        /// Threshold overrides.
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Export detections as a JSON document.
    Export {
        /// Existing detection log.
        store: PathBuf,
        /// JSON file to write.
        output_json: PathBuf,
    },
    /// Run several steps in sequence.
    Run(RunArgs),
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Download a Snapshot Serengeti season sample from LILA.
    Fetch(FetchArgs),
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Detector overrides.
#[derive(Debug, Args)]
pub struct DetectorArgs {
    /// Path to the detector ONNX model (overrides config).
    #[arg(long, env = "CAMTRAP_DETECTOR_MODEL")]
    pub detector_model: Option<PathBuf>,
}

impl DetectorArgs {
    /// Apply these overrides to `base`.
    pub fn resolve(&self, base: &DetectorConfig) -> DetectorConfig {
        let mut config = base.clone();
        if let Some(model) = &self.detector_model {
            config.model = Some(model.clone());
        }
        config
    }
}

/// Classifier overrides.
#[derive(Debug, Args)]
pub struct ClassifierArgs {
    /// Path to the species classifier ONNX model (overrides config).
    #[arg(long, env = "CAMTRAP_CLASSIFIER_MODEL")]
    pub classifier_model: Option<PathBuf>,

    /// Path to the classifier labels file (overrides config).
    #[arg(long, env = "CAMTRAP_CLASSIFIER_LABELS")]
    pub classifier_labels: Option<PathBuf>,
}

impl ClassifierArgs {
    /// Apply these overrides to `base`.
    pub fn resolve(&self, base: &ClassifierConfig) -> ClassifierConfig {
        let mut config = base.clone();
        if let Some(model) = &self.classifier_model {
            config.model = Some(model.clone());
        }
        if let Some(labels) = &self.classifier_labels {
            config.labels = Some(labels.clone());
        }
        config
    }
}

/// Execution device flags.
#[derive(Debug, Args)]
pub struct InferenceArgs {
    /// Enable CUDA GPU acceleration.
    #[arg(long, conflicts_with = "cpu")]
    pub gpu: bool,

    /// Force CPU inference.
    #[arg(long, conflicts_with = "gpu")]
    pub cpu: bool,
}

impl InferenceArgs {
    /// Device to use, falling back to `configured`.
    pub const fn device(&self, configured: InferenceDevice) -> InferenceDevice {
        if self.gpu {
            InferenceDevice::Gpu
        } else if self.cpu {
            InferenceDevice::Cpu
        } else {
            configured
        }
    }
}

/// Threshold overrides.
#[derive(Debug, Args)]
pub struct ThresholdArgs {
    /// Classification confidence a species label must exceed (0.0-1.0).
    #[arg(long, value_parser = parse_unit, env = "CAMTRAP_CLASSIFICATION_THRESHOLD")]
    pub classification_threshold: Option<f64>,

    /// Detection confidence a row must exceed to count as non-empty (0.0-1.0).
    #[arg(long, value_parser = parse_unit)]
    pub detection_floor: Option<f64>,
}

impl ThresholdArgs {
    /// Apply these overrides to `base`.
    pub fn resolve(&self, base: Thresholds) -> Thresholds {
        Thresholds {
            classification: self.classification_threshold.unwrap_or(base.classification),
            detection_floor: self.detection_floor.unwrap_or(base.detection_floor),
        }
    }
}

/// Arguments for the run command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Folder of source images.
    pub input_dir: PathBuf,

    /// Steps to run, in order (detect, metadata, classify, sort, visualize, json).
    #[arg(long, value_delimiter = ',', num_args = 1.., value_parser = parse_stage)]
    pub steps: Option<Vec<Stage>>,

    /// Detection log path (default from config).
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// JSON export path (default from config).
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Sorted images folder (default from config).
    #[arg(long)]
    pub sorted: Option<PathBuf>,

    /// Annotated images folder (default from config).
    #[arg(long)]
    pub annotated: Option<PathBuf>,

    /// Species crops folder (default from config).
    #[arg(long)]
    pub crops: Option<PathBuf>,

    /// Column order for the detection log (default: master order).
    #[arg(long, value_parser = parse_column_order)]
    pub column_order: Option<ColumnOrder>,

    /// Detector model options.
    #[command(flatten)]
    pub detector: DetectorArgs,

    /// Classifier model options.
    #[command(flatten)]
    pub classifier: ClassifierArgs,

    /// Device selection.
    #[command(flatten)]
    pub inference: InferenceArgs,

    /// Threshold overrides.
    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

impl RunArgs {
    /// Steps to run; every step when none were given.
    pub fn stages(&self) -> Vec<Stage> {
        self.steps
            .clone()
            .filter(|steps| !steps.is_empty())
            .unwrap_or_else(|| Stage::ALL.to_vec())
    }
}

/// Arguments for the fetch command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Annotations CSV with a `capture_id` column.
    #[arg(long)]
    pub annotations: PathBuf,

    /// Images CSV with `capture_id` and `image_path_rel` columns.
    #[arg(long)]
    pub images: PathBuf,

    /// Capture id prefix selecting the season.
    #[arg(long, default_value = DEFAULT_SEASON)]
    pub season: String,

    /// Maximum number of captures (-1 for all).
    #[arg(long, default_value_t = DEFAULT_LIMIT, allow_negative_numbers = true)]
    pub limit: i64,

    /// Download folder.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,
}
