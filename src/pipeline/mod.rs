//! Stage orchestration for the `run` command.

mod orchestrator;
mod stage;

pub use orchestrator::{ModelProvider, OnnxModels, Pipeline, PipelineSettings, build_annotator};
pub use stage::Stage;
