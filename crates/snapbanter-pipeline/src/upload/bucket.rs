//! Object-storage uploader: `PUT <bucket_url>/<id>.jpg`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use snapbanter::is_remote_reference;
use snapbanter::storage::IMAGE_EXTENSION;

use super::ImageUploader;
use crate::config::BucketSettings;
use crate::generation::{bearer_header, build_http_client};
use crate::types::{PipelineError, PipelineResult};

/// Uploads captures to a bucket and returns their object URL.
#[derive(Debug, Clone)]
pub struct BucketUploader {
    client: reqwest::Client,
    bucket_url: String,
}

impl BucketUploader {
    pub fn new(settings: BucketSettings) -> PipelineResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &settings.api_key {
            headers.insert(AUTHORIZATION, bearer_header(key)?);
        }
        headers.insert("x-upsert", HeaderValue::from_static("true"));

        Ok(Self {
            client: build_http_client(headers, settings.timeout)?,
            bucket_url: settings.bucket_url.trim_end_matches('/').to_string(),
        })
    }

    /// Object URL a capture with `id` is stored under.
    pub fn object_url(&self, id: &str) -> String {
        format!("{}/{id}.{IMAGE_EXTENSION}", self.bucket_url)
    }
}

#[async_trait]
impl ImageUploader for BucketUploader {
    async fn upload(&self, persisted_ref: &str, id: &str) -> PipelineResult<String> {
        if is_remote_reference(persisted_ref) {
            return Ok(persisted_ref.to_string());
        }

        let local = persisted_ref.strip_prefix("file://").unwrap_or(persisted_ref);
        let bytes = tokio::fs::read(local)
            .await
            .map_err(|e| PipelineError::Upload(format!("failed to read capture {local}: {e}")))?;

        let url = self.object_url(id);
        let response = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("image/jpeg"))
            .body(bytes)
            .send()
            .await
            .map_err(|e| PipelineError::Upload(format!("upload request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(id, status = %status, "bucket upload rejected: {body}");
            return Err(PipelineError::Upload(format!("bucket returned {status}: {body}")));
        }

        debug!(id, "Uploaded capture to {url}");
        Ok(url)
    }
}
