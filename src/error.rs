//! Error types for wearable-align

use std::path::PathBuf;
use thiserror::Error;

/// No timestamp strategy could interpret a token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unparseable timestamp token: {token:?}")]
pub struct TimestampParseError {
    pub token: String,
}

/// Errors that can occur while loading or aligning a session
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Format error in {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error(transparent)]
    TimestampParse(#[from] TimestampParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
