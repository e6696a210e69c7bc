//! In-process stage runner.

use crate::config::{ClassifierConfig, DetectorConfig, InferenceDevice, Thresholds, VisualizeConfig};
use crate::error::{Error, Result};
use crate::imaging::{Annotator, DrawStyle, load_font};
use crate::inference::{Detector, OnnxDetector, OnnxSpeciesClassifier, SpeciesClassifier};
use crate::passes::{self, PassSummary, visualize::VisualizeTargets};
use crate::pipeline::Stage;
use crate::store::ColumnOrder;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

/// Supplies inference backends to the stages that need them.
///
/// Backends are requested only when a stage that uses them runs, so a
/// `run --steps sort` never loads a model.
pub trait ModelProvider {
    /// The detector for the `detect` stage.
    fn detector(&mut self) -> Result<&mut dyn Detector>;
    /// The classifier for the `classify` stage.
    fn classifier(&mut self) -> Result<&mut dyn SpeciesClassifier>;
}

/// Loads the ONNX backends from configuration on first use.
pub struct OnnxModels {
    detector_config: DetectorConfig,
    classifier_config: ClassifierConfig,
    device: InferenceDevice,
    detector: Option<OnnxDetector>,
    classifier: Option<OnnxSpeciesClassifier>,
}

impl OnnxModels {
    /// Create a provider; nothing is loaded yet.
    pub const fn new(
        detector_config: DetectorConfig,
        classifier_config: ClassifierConfig,
        device: InferenceDevice,
    ) -> Self {
        Self {
            detector_config,
            classifier_config,
            device,
            detector: None,
            classifier: None,
        }
    }
}

impl ModelProvider for OnnxModels {
    fn detector(&mut self) -> Result<&mut dyn Detector> {
        if self.detector.is_none() {
            self.detector = Some(OnnxDetector::from_config(&self.detector_config, self.device)?);
        }
        self.detector
            .as_mut()
            .map(|d| d as &mut dyn Detector)
            .ok_or_else(|| Error::Internal {
                message: "detector not initialised".to_string(),
            })
    }

    fn classifier(&mut self) -> Result<&mut dyn SpeciesClassifier> {
        if self.classifier.is_none() {
            self.classifier = Some(OnnxSpeciesClassifier::from_config(
                &self.classifier_config,
                self.device,
            )?);
        }
        self.classifier
            .as_mut()
            .map(|c| c as &mut dyn SpeciesClassifier)
            .ok_or_else(|| Error::Internal {
                message: "classifier not initialised".to_string(),
            })
    }
}

/// Locations and settings shared by every stage of a run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Source images.
    pub input_dir: PathBuf,
    /// Master detection log.
    pub store: PathBuf,
    /// Exported JSON document.
    pub json: PathBuf,
    /// Parent of the sort folders.
    pub sorted: PathBuf,
    /// Annotated images.
    pub annotated: PathBuf,
    /// Species crop folders.
    pub crops: PathBuf,
    /// Column order every rewrite uses.
    pub column_order: ColumnOrder,
    /// Decision thresholds.
    pub thresholds: Thresholds,
    /// Annotation drawing style.
    pub visualize: VisualizeConfig,
    /// Whether to show progress bars.
    pub show_progress: bool,
}

/// Runs an ordered list of stages, stopping at the first failure.
pub struct Pipeline {
    settings: PipelineSettings,
}

impl Pipeline {
    /// Create a pipeline.
    pub const fn new(settings: PipelineSettings) -> Self {
        Self { settings }
    }

    /// Settings in use.
    pub const fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run `stages` in order.
    ///
    /// Returns the summary of every completed stage, or
    /// [`Error::StageFailed`] naming the first stage that failed.
    pub fn run(&self, stages: &[Stage], models: &mut dyn ModelProvider) -> Result<Vec<PassSummary>> {
        let start = Instant::now();
        let mut summaries = Vec::with_capacity(stages.len());

        for &stage in stages {
            info!("Running step: {stage}");
            match self.run_stage(stage, models) {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    error!("Pipeline failed at step '{stage}': {e}");
                    return Err(Error::StageFailed {
                        stage: stage.to_string(),
                        source: Box::new(e),
                    });
                }
            }
        }

        info!(
            "Pipeline finished: {} step(s) in {:.2}s",
            summaries.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(summaries)
    }

    /// Run a single stage.
    pub fn run_stage(&self, stage: Stage, models: &mut dyn ModelProvider) -> Result<PassSummary> {
        let s = &self.settings;
        match stage {
            Stage::Detect => passes::detect::run(
                &s.input_dir,
                &s.store,
                &s.column_order,
                models.detector()?,
                s.show_progress,
            ),
            Stage::Metadata => {
                passes::metadata::run(&s.input_dir, &s.store, &s.column_order, s.show_progress)
            }
            Stage::Classify => passes::classify::run(
                &s.input_dir,
                &s.store,
                &s.column_order,
                models.classifier()?,
                s.show_progress,
            ),
            Stage::Sort => passes::sort::run(
                &s.input_dir,
                &s.store,
                &s.sorted,
                &s.thresholds,
                s.show_progress,
            )
            .map(|report| report.summary),
            Stage::Visualize => {
                let annotator = build_annotator(&s.visualize);
                passes::visualize::run(
                    &s.input_dir,
                    &s.store,
                    VisualizeTargets {
                        annotated_dir: &s.annotated,
                        crop_dir: &s.crops,
                    },
                    &s.thresholds,
                    &annotator,
                    s.show_progress,
                )
            }
            Stage::Json => passes::export::run(&s.store, &s.json),
        }
    }
}

/// Annotator for `config`, with font fallback.
pub fn build_annotator(config: &VisualizeConfig) -> Annotator {
    Annotator::new(
        load_font(config.font.as_deref()),
        DrawStyle {
            box_thickness: config.box_thickness,
            label_scale: config.label_scale,
        },
    )
}
