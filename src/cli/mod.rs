//! CLI argument parsing.

mod args;
pub mod validators;

pub use args::{
    ClassifierArgs, Cli, Command, ConfigAction, DetectorArgs, FetchArgs, GlobalArgs,
    InferenceArgs, RunArgs, ThresholdArgs,
};
