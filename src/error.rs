use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Missing input {path}: {hint}")]
    MissingInput { path: PathBuf, hint: String },

    #[error("Missing required column '{column}' in {context}")]
    MissingColumn { column: String, context: String },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Fatal missing-artifact error pointing the operator at the stage that
    /// should have produced it.
    pub fn missing_input(path: impl Into<PathBuf>, hint: impl Into<String>) -> Self {
        PipelineError::MissingInput {
            path: path.into(),
            hint: hint.into(),
        }
    }

    pub fn missing_column(column: impl Into<String>, context: impl Into<String>) -> Self {
        PipelineError::MissingColumn {
            column: column.into(),
            context: context.into(),
        }
    }
}
