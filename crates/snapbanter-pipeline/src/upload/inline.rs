//! Inline uploader: embeds the capture in a `data:` URL.

use async_trait::async_trait;

use snapbanter::{is_remote_reference, read_data_url};

use super::ImageUploader;
use crate::types::{PipelineError, PipelineResult};

/// Needs no storage service. Remote references pass through untouched.
#[derive(Debug, Clone, Default)]
pub struct InlineUploader;

#[async_trait]
impl ImageUploader for InlineUploader {
    async fn upload(&self, persisted_ref: &str, id: &str) -> PipelineResult<String> {
        if is_remote_reference(persisted_ref) {
            return Ok(persisted_ref.to_string());
        }

        let url = read_data_url(persisted_ref)
            .await
            .map_err(|e| PipelineError::Upload(format!("failed to read capture {persisted_ref}: {e}")))?;
        tracing::debug!(id, bytes = url.len(), "Encoded capture inline");
        Ok(url)
    }
}
