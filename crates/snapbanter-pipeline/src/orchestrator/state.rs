//! Submission lifecycle states and the generation outcome.

use std::fmt;

use snapbanter::Excerpt;

use crate::types::PipelineError;

/// Where a submission is in its lifecycle. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Submitted,
    Persisting,
    Generating,
    Succeeded,
    Failed,
}

impl SubmissionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionState::Succeeded | SubmissionState::Failed)
    }

    /// Whether `next` may follow `self`.
    pub fn can_transition_to(self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Submitted, Persisting) | (Persisting, Generating) | (Generating, Succeeded) | (Generating, Failed)
        )
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionState::Submitted => "submitted",
            SubmissionState::Persisting => "persisting",
            SubmissionState::Generating => "generating",
            SubmissionState::Succeeded => "succeeded",
            SubmissionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of the generating step, consumed once by reconciliation.
#[derive(Debug)]
pub enum GenerationOutcome {
    Success(Vec<Excerpt>),
    Failure(PipelineError),
}

impl GenerationOutcome {
    /// Terminal state this outcome settles a submission into.
    pub fn terminal_state(&self) -> SubmissionState {
        match self {
            GenerationOutcome::Success(_) => SubmissionState::Succeeded,
            GenerationOutcome::Failure(_) => SubmissionState::Failed,
        }
    }
}

impl From<Result<Vec<Excerpt>, PipelineError>> for GenerationOutcome {
    fn from(result: Result<Vec<Excerpt>, PipelineError>) -> Self {
        match result {
            Ok(excerpts) => GenerationOutcome::Success(excerpts),
            Err(e) => GenerationOutcome::Failure(e),
        }
    }
}
