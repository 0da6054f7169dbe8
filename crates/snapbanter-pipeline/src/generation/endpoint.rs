//! Client for the generate-banter endpoint.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use snapbanter::{parse_excerpts, Excerpt, GenerationError};

use super::{bearer_header, build_http_client, require_image_ref, BanterGenerator};
use crate::config::EndpointSettings;
use crate::types::{ErrorBody, GenerateRequest, PipelineResult};

/// Posts `{"image_url": ...}` to the endpoint and parses the returned excerpts.
#[derive(Debug, Clone)]
pub struct EndpointClient {
    client: reqwest::Client,
    url: String,
}

impl EndpointClient {
    pub fn new(settings: EndpointSettings) -> PipelineResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &settings.api_key {
            headers.insert(AUTHORIZATION, bearer_header(key)?);
        }

        Ok(Self {
            client: build_http_client(headers, settings.timeout)?,
            url: settings.url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BanterGenerator for EndpointClient {
    async fn generate(&self, image_ref: &str) -> Result<Vec<Excerpt>, GenerationError> {
        require_image_ref(image_ref)?;

        let response = self
            .client
            .post(&self.url)
            .json(&GenerateRequest::new(image_ref))
            .send()
            .await
            .map_err(|e| GenerationError::Request(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Request(format!("failed to read response body: {e}")))?;
        debug!(status = %status, bytes = body.len(), "generate-banter response received");

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            warn!(status = %status, "generate-banter endpoint returned an error: {message}");
            return Err(GenerationError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        parse_excerpts(&body)
    }
}
