//! Error types for camtrap.

use std::path::PathBuf;

/// Result type alias for camtrap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for camtrap.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// The column order contract could not be parsed.
    #[error("invalid column order: {message}")]
    InvalidColumnOrder {
        /// Description of the problem.
        message: String,
    },

    /// The detection log does not exist.
    #[error("detection log not found: {path}")]
    StoreNotFound {
        /// Path to the missing store.
        path: PathBuf,
    },

    /// The detection log has no records.
    #[error("detection log '{path}' is empty or cannot be read")]
    EmptyStore {
        /// Path to the store.
        path: PathBuf,
    },

    /// The detection log header names a column this crate does not know.
    #[error("detection log '{path}' has unknown column '{column}'")]
    UnknownColumn {
        /// Path to the store.
        path: PathBuf,
        /// The unrecognised header name.
        column: String,
    },

    /// Rewriting the store would drop rows that failed to parse.
    #[error("detection log '{path}' has {count} malformed row(s), first at line {first_line}: {reason}")]
    MalformedStore {
        /// Path to the store.
        path: PathBuf,
        /// Number of rejected rows.
        count: usize,
        /// Line of the first rejected row.
        first_line: u64,
        /// Why the first row was rejected.
        reason: String,
    },

    /// Failed to read the store as CSV.
    #[error("failed to read detection log '{path}'")]
    StoreRead {
        /// Path to the store.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Failed to write the store.
    #[error("failed to write detection log '{path}'")]
    StoreWrite {
        /// Path to the store.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Another writer holds the store.
    #[error("detection log is locked by another process (lock file: {path})")]
    StoreLocked {
        /// Path to the lock file.
        path: PathBuf,
    },

    /// Failed to create lock file.
    #[error("failed to create lock file '{path}'")]
    LockCreate {
        /// Path to the lock file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove a stale lock file.
    #[error("failed to remove stale lock file '{path}'")]
    LockRemove {
        /// Path to the lock file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No matching images in the input directory.
    #[error("no .jpg images found in {path}")]
    NoImagesFound {
        /// The searched directory.
        path: PathBuf,
    },

    /// Input directory does not exist or is not a directory.
    #[error("input directory does not exist: {path}")]
    InputDirNotFound {
        /// The missing directory.
        path: PathBuf,
    },

    /// Failed to create output directory.
    #[error("failed to create output directory '{path}'")]
    OutputDirCreateFailed {
        /// Path to the output directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to decode or encode an image.
    #[error("image error for '{path}'")]
    Image {
        /// Path to the image.
        path: PathBuf,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// Model file does not exist.
    #[error("model file does not exist: {path}")]
    ModelFileNotFound {
        /// Path to the missing model file.
        path: PathBuf,
    },

    /// Labels file does not exist.
    #[error("labels file does not exist: {path}")]
    LabelsFileNotFound {
        /// Path to the missing labels file.
        path: PathBuf,
    },

    /// A model is required by the requested stage but none is configured.
    #[error("no {kind} model configured (use --{kind}-model or set [{kind}] model in config)")]
    ModelNotConfigured {
        /// `detector` or `classifier`.
        kind: &'static str,
    },

    /// Failed to load an ONNX model.
    #[error("failed to load model '{path}': {reason}")]
    ModelLoad {
        /// Path to the model file.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Inference failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// Failed to write JSON output file.
    #[error("failed to write JSON output file '{path}'")]
    JsonWrite {
        /// Path to the JSON file.
        path: PathBuf,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A pipeline stage failed; later stages were not run.
    #[error("pipeline failed at step '{stage}'")]
    StageFailed {
        /// Name of the failing stage.
        stage: String,
        /// The stage's error.
        #[source]
        source: Box<Error>,
    },

    /// Failed to read a dataset metadata CSV.
    #[error("failed to read dataset file '{path}'")]
    DatasetRead {
        /// Path to the CSV.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Download failed.
    #[error("failed to download from '{url}'")]
    DownloadFailed {
        /// URL that failed.
        url: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}
