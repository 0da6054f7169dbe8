//! Direct client for OpenAI-compatible chat-completion APIs.
//!
//! Sends the capture as an `image_url` content part next to the banter
//! instruction and runs the model's text through the excerpt parsing contract.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use snapbanter::excerpts::{response_schema, SYSTEM_PROMPT, USER_INSTRUCTION};
use snapbanter::{parse_excerpts, Excerpt, GenerationError};

use super::{bearer_header, build_http_client, require_image_ref, BanterGenerator};
use crate::config::{CompletionSettings, ResponseMode};
use crate::types::PipelineResult;

const SCHEMA_NAME: &str = "banter_schema";

/// Chat-completion backed generator.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    response_mode: ResponseMode,
    system_prompt: String,
}

impl CompletionClient {
    pub fn new(settings: CompletionSettings) -> PipelineResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer_header(&settings.api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            client: build_http_client(headers, settings.timeout)?,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            model: settings.model,
            temperature: settings.temperature,
            response_mode: settings.response_mode,
            system_prompt: settings.system_prompt.unwrap_or_else(|| SYSTEM_PROMPT.to_string()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request<'a>(&'a self, image_ref: &'a str) -> ChatRequest<'a> {
        let response_format = match self.response_mode {
            ResponseMode::JsonSchema => ResponseFormat::JsonSchema {
                json_schema: JsonSchemaSpec {
                    name: SCHEMA_NAME,
                    schema: response_schema(),
                    strict: true,
                },
            },
            ResponseMode::JsonObject => ResponseFormat::JsonObject,
        };

        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::System {
                    content: &self.system_prompt,
                },
                ChatMessage::User {
                    content: vec![
                        ContentPart::Text {
                            text: USER_INSTRUCTION,
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: image_ref,
                                detail: "low",
                            },
                        },
                    ],
                },
            ],
            temperature: self.temperature,
            response_format,
        }
    }
}

#[async_trait]
impl BanterGenerator for CompletionClient {
    async fn generate(&self, image_ref: &str) -> Result<Vec<Excerpt>, GenerationError> {
        require_image_ref(image_ref)?;

        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request(image_ref))
            .send()
            .await
            .map_err(|e| GenerationError::Request(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Request(format!("failed to read response body: {e}")))?;
        debug!(status = %status, model = %self.model, "completion response received");

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => api_err.error.message,
                Err(_) => body,
            };
            warn!(status = %status, "completion API returned an error: {message}");
            return Err(GenerationError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::Parse(format!("unexpected completion envelope: {e}")))?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        parse_excerpts(&content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum ChatMessage<'a> {
    System { content: &'a str },
    User { content: Vec<ContentPart<'a>> },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
    detail: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseFormat {
    JsonSchema { json_schema: JsonSchemaSpec },
    JsonObject,
}

#[derive(Debug, Serialize)]
struct JsonSchemaSpec {
    name: &'static str,
    schema: Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
