//! Core data types for banters, excerpts, and their errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Excerpt shown while a banter is still being generated.
pub const GENERATING_TEXT: &str = "Generating...";

/// Excerpt shown once generation has failed.
pub const FAILED_TEXT: &str = "Failed to generate banter";

/// One short generated caption line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Excerpt {
    pub text: String,
}

impl Excerpt {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A captured image plus its generated caption excerpts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banter {
    pub id: String,
    pub image_uri: String,
    pub excerpts: Vec<Excerpt>,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_generating: bool,
}

impl Banter {
    /// Build the optimistic placeholder inserted before generation starts.
    pub fn pending(id: impl Into<String>, image_uri: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            image_uri: image_uri.into(),
            excerpts: vec![Excerpt::new(GENERATING_TEXT)],
            created_at,
            is_generating: true,
        }
    }

    /// Whether this banter settled into the failure placeholder.
    pub fn is_failed(&self) -> bool {
        !self.is_generating && self.excerpts.len() == 1 && self.excerpts[0].text == FAILED_TEXT
    }

    /// Merge the fields present in `patch` into this banter.
    pub fn apply(&mut self, patch: BanterPatch) {
        if let Some(image_uri) = patch.image_uri {
            self.image_uri = image_uri;
        }
        if let Some(excerpts) = patch.excerpts {
            self.excerpts = excerpts;
        }
        if let Some(is_generating) = patch.is_generating {
            self.is_generating = is_generating;
        }
    }
}

/// Field-level partial update of a [`Banter`]. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BanterPatch {
    pub image_uri: Option<String>,
    pub excerpts: Option<Vec<Excerpt>>,
    pub is_generating: Option<bool>,
}

impl BanterPatch {
    /// Terminal patch for a successful generation.
    pub fn succeeded(excerpts: Vec<Excerpt>) -> Self {
        Self {
            excerpts: Some(excerpts),
            is_generating: Some(false),
            ..Self::default()
        }
    }

    /// Terminal patch for a failed generation.
    pub fn failed() -> Self {
        Self {
            excerpts: Some(vec![Excerpt::new(FAILED_TEXT)]),
            is_generating: Some(false),
            ..Self::default()
        }
    }

    pub fn with_image_uri(mut self, image_uri: impl Into<String>) -> Self {
        self.image_uri = Some(image_uri.into());
        self
    }
}

/// ISO-8601 wire form for timestamps: millisecond precision, `Z` suffix.
pub mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}

/// Errors raised while producing excerpts from a remote generator.
#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No valid excerpts produced")]
    NoExcerpts,
}

impl GenerationError {
    /// Response text could not be recovered as JSON by any parse path.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, GenerationError::Parse(_))
    }
}

/// Errors that can occur in the core library.
#[derive(thiserror::Error, Debug)]
pub enum BanterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Banter already exists: {0}")]
    DuplicateBanter(String),

    #[error("Banter not found: {0}")]
    BanterNotFound(String),
}

/// Convenience result type.
pub type BanterResult<T> = Result<T, BanterError>;
