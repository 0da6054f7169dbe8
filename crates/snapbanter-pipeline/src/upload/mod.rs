//! Turning a locally persisted capture into a reference a remote generator can fetch.

pub mod bucket;
pub mod inline;

use async_trait::async_trait;

use crate::types::PipelineResult;

pub use bucket::BucketUploader;
pub use inline::InlineUploader;

/// Upload bytes, get back a reference.
///
/// Failures are reported as [`PipelineError::Upload`](crate::types::PipelineError::Upload)
/// and end the submission in the Failed state.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, persisted_ref: &str, id: &str) -> PipelineResult<String>;
}
