//! Remote banter generation.
//!
//! Every generator shares the parsing contract in [`snapbanter::excerpts`]: a
//! response either yields a non-empty, ordered excerpt list or a
//! [`GenerationError`].

pub mod completion;
pub mod endpoint;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use snapbanter::{Excerpt, GenerationError};

use crate::types::{PipelineError, PipelineResult};

pub use completion::CompletionClient;
pub use endpoint::EndpointClient;

/// Turns an image reference into 3–5 short caption lines.
#[async_trait]
pub trait BanterGenerator: Send + Sync {
    async fn generate(&self, image_ref: &str) -> Result<Vec<Excerpt>, GenerationError>;
}

/// Reject references no remote service could resolve.
pub(crate) fn require_image_ref(image_ref: &str) -> Result<(), GenerationError> {
    if image_ref.trim().is_empty() {
        return Err(GenerationError::InvalidInput(
            "Missing required field: image_url".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn build_http_client(headers: HeaderMap, timeout: Option<Duration>) -> PipelineResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().default_headers(headers);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn bearer_header(key: &str) -> PipelineResult<reqwest::header::HeaderValue> {
    reqwest::header::HeaderValue::from_str(&format!("Bearer {key}"))
        .map_err(|e| PipelineError::Config(format!("invalid API key header value: {e}")))
}
