//! Error types for the upload-and-generate pipeline.

use snapbanter::{BanterError, GenerationError};

/// Text shown to the user when a submission fails.
pub const FAILURE_ALERT: &str = "We couldn't generate banter for that photo. Please try again.";

/// All errors that can occur in the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Durable remote storage of the capture failed.
    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Request rejected before any generation work started.
    #[error("{0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),

    /// The task settling a submission panicked or was cancelled.
    #[error("Submission task failed: {0}")]
    Task(String),

    #[error("Core error: {0}")]
    Core(#[from] BanterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// HTTP status the generate-banter endpoint answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::Validation(_) => 400,
            PipelineError::Json(_) => 400,
            PipelineError::Generation(GenerationError::InvalidInput(_)) => 400,
            PipelineError::Generation(_) | PipelineError::Upload(_) => 502,
            PipelineError::Config(_)
            | PipelineError::Task(_)
            | PipelineError::Core(_)
            | PipelineError::Io(_) => 500,
        }
    }

    /// Whether this failure ends a submission in the Failed state.
    pub fn is_submission_failure(&self) -> bool {
        matches!(self, PipelineError::Upload(_) | PipelineError::Generation(_))
    }

    /// Message suitable for a user-facing alert.
    pub fn user_message(&self) -> &'static str {
        FAILURE_ALERT
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
