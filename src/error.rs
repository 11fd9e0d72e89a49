use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetAnalysisError {
    #[error("Invalid configuration value for {field}: {details}")]
    InvalidConfig { field: String, details: String },

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Sheet source error: {0}")]
    Source(#[from] SourceError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure reported by a caller-supplied grid or formula source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Worksheet not found: {0}")]
    NotFound(String),

    #[error("Formula lookup is not supported by this source")]
    Unsupported,

    #[error("Source timed out after {0} ms")]
    Timeout(u64),

    #[error("Source failure: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, SheetAnalysisError>;
