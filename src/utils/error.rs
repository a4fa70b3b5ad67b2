use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline errors. Recoverable conditions (a malformed row, a rule
/// violation, a failed output write) are counted and surfaced in the run
/// summary instead of being raised.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("no recognizable header in {}: {message}", path.display())]
    SchemaMissing { path: PathBuf, message: String },

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("invalid configuration value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("chart rendering failed: {message}")]
    ChartError { message: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
