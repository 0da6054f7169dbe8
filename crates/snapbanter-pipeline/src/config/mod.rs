//! Configuration loading and resolution.

use std::path::PathBuf;
use std::time::Duration;

use crate::types::{PipelineError, PipelineResult};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_SERVE_ADDR: &str = "127.0.0.1:8787";

/// Resolve the data directory holding `banters.json` and `images/`.
pub fn resolve_data_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var("SNAPBANTER_DATA_DIR") {
        return PathBuf::from(env_path);
    }

    let cwd_dir = PathBuf::from(".snapbanter");
    if cwd_dir.is_dir() {
        return cwd_dir;
    }

    resolve_default_data_dir()
}

fn resolve_default_data_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    PathBuf::from(home).join(".snapbanter")
}

/// Resolve the generate-banter endpoint URL.
pub fn resolve_endpoint(explicit: Option<&str>) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| non_empty_env("SNAPBANTER_ENDPOINT"))
}

/// How the chat-completion backend is asked to shape its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Schema-constrained output (forces conformance).
    #[default]
    JsonSchema,
    /// Plain JSON output with the same instruction text.
    JsonObject,
}

impl std::str::FromStr for ResponseMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json_schema" | "schema" => Ok(ResponseMode::JsonSchema),
            "json_object" | "json" => Ok(ResponseMode::JsonObject),
            other => Err(PipelineError::Config(format!(
                "Unknown response mode: {other}. Use 'json_schema' or 'json_object'."
            ))),
        }
    }
}

/// Settings for the generate-banter endpoint client.
#[derive(Debug, Clone)]
pub struct EndpointSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
}

impl EndpointSettings {
    pub fn from_env(url: String) -> Self {
        Self {
            url,
            api_key: non_empty_env("SNAPBANTER_API_KEY"),
            timeout: env_timeout(),
        }
    }
}

/// Settings for a direct chat-completion backend.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub response_mode: ResponseMode,
    pub system_prompt: Option<String>,
    pub timeout: Option<Duration>,
}

impl CompletionSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_COMPLETION_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            response_mode: ResponseMode::default(),
            system_prompt: None,
            timeout: None,
        }
    }

    /// Read settings from `OPENAI_*` and `SNAPBANTER_*` variables.
    pub fn from_env() -> PipelineResult<Self> {
        let api_key = non_empty_env("OPENAI_API_KEY")
            .ok_or_else(|| PipelineError::Config("OPENAI_API_KEY is not configured".to_string()))?;

        let mut settings = Self::new(api_key);
        if let Some(model) = non_empty_env("OPENAI_MODEL") {
            settings.model = model;
        }
        if let Some(base_url) = non_empty_env("OPENAI_BASE_URL") {
            settings.base_url = base_url;
        }
        if let Some(mode) = non_empty_env("SNAPBANTER_RESPONSE_MODE") {
            settings.response_mode = mode.parse()?;
        }
        settings.system_prompt = non_empty_env("SNAPBANTER_SYSTEM_PROMPT");
        settings.timeout = env_timeout();
        Ok(settings)
    }
}

/// Settings for uploading captures to an object-storage bucket.
#[derive(Debug, Clone)]
pub struct BucketSettings {
    pub bucket_url: String,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
}

impl BucketSettings {
    /// `None` unless `SNAPBANTER_BUCKET_URL` is set.
    pub fn from_env() -> Option<Self> {
        non_empty_env("SNAPBANTER_BUCKET_URL").map(|bucket_url| Self {
            bucket_url,
            api_key: non_empty_env("SNAPBANTER_API_KEY"),
            timeout: env_timeout(),
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Optional request timeout; unset means requests may wait indefinitely.
fn env_timeout() -> Option<Duration> {
    let raw = non_empty_env("SNAPBANTER_TIMEOUT_SECS")?;
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            tracing::warn!("Ignoring invalid SNAPBANTER_TIMEOUT_SECS: {raw}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_data_dir_wins() {
        assert_eq!(resolve_data_dir(Some("/srv/banter")), PathBuf::from("/srv/banter"));
    }

    #[test]
    fn test_explicit_endpoint_wins() {
        assert_eq!(
            resolve_endpoint(Some("https://fn.example/generate-banter")).as_deref(),
            Some("https://fn.example/generate-banter")
        );
    }

    #[test]
    fn test_response_mode_parsing() {
        assert_eq!("json_schema".parse::<ResponseMode>().unwrap(), ResponseMode::JsonSchema);
        assert_eq!("JSON_OBJECT".parse::<ResponseMode>().unwrap(), ResponseMode::JsonObject);
        assert!("yaml".parse::<ResponseMode>().is_err());
    }

    #[test]
    fn test_completion_defaults() {
        let settings = CompletionSettings::new("sk-test");
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.response_mode, ResponseMode::JsonSchema);
        assert!(settings.timeout.is_none());
    }
}
