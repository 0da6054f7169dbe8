//! Parsing contract for generated banter text.
//!
//! Remote generators are asked for `{"excerpts": [...]}` and nothing else, but
//! they do not always comply. The parser accepts a bare JSON body, salvages the
//! first balanced JSON object out of surrounding prose or markdown fences, and
//! tolerates excerpt items given either as strings or as `{"text": ...}`.

use serde_json::Value;

use crate::types::{Excerpt, GenerationError};

/// Fewest excerpts the generator is asked for.
pub const MIN_EXCERPTS: usize = 3;

/// Most excerpts kept from a response.
pub const MAX_EXCERPTS: usize = 5;

/// Character limit the generator is asked to respect for each excerpt.
pub const MAX_EXCERPT_CHARS: usize = 140;

/// Instruction sent alongside the image in every generation request.
pub const USER_INSTRUCTION: &str = "Return ONLY JSON with shape {\"excerpts\":[\"...\"]}. 3-5 items. Each under 140 chars. Light, kind, playful. Reference the image context.";

/// Default system prompt for chat-completion backends.
pub const SYSTEM_PROMPT: &str = "You are a witty, friendly banter writer. Given an image, produce 3-5 short, playful one-liners. Keep each under 140 characters, avoid profanity, be kind.";

/// Parse a raw generator response into an ordered excerpt list.
pub fn parse_excerpts(raw: &str) -> Result<Vec<Excerpt>, GenerationError> {
    let payload = parse_payload(raw)?;
    let mut excerpts = normalize_excerpts(&payload);
    if excerpts.is_empty() {
        return Err(GenerationError::NoExcerpts);
    }
    if excerpts.len() > MAX_EXCERPTS {
        tracing::debug!(count = excerpts.len(), "Truncating excerpts to {MAX_EXCERPTS}");
        excerpts.truncate(MAX_EXCERPTS);
    }
    Ok(excerpts)
}

/// Decode `raw` as JSON, falling back to the first embedded object.
pub fn parse_payload(raw: &str) -> Result<Value, GenerationError> {
    if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(value);
    }

    salvage_object(raw)
        .and_then(|candidate| serde_json::from_str(candidate).ok())
        .ok_or_else(|| {
            GenerationError::Parse(format!(
                "response is not JSON and holds no embedded object: {}",
                preview(raw)
            ))
        })
}

/// Longest response the salvage path will scan.
pub const MAX_SALVAGE_BYTES: usize = 64 * 1024;

/// Find the first balanced `{...}` substring of `raw` that parses as JSON.
///
/// Braces inside string literals are ignored, so `{"a": "}"}` is one object.
/// Inputs over [`MAX_SALVAGE_BYTES`] are not scanned.
pub fn salvage_object(raw: &str) -> Option<&str> {
    if raw.len() > MAX_SALVAGE_BYTES {
        tracing::debug!(bytes = raw.len(), "Response too large to salvage");
        return None;
    }

    object_spans(raw)
        .into_iter()
        .map(|(start, end)| &raw[start..end])
        .find(|candidate| serde_json::from_str::<Value>(candidate).is_ok())
}

/// Byte spans of every balanced `{...}` in `raw`, ordered by start.
///
/// One pass with a stack of open positions. Quotes only start a string while
/// some brace is open, so prose around the object cannot desync the scan.
fn object_spans(raw: &str) -> Vec<(usize, usize)> {
    let mut open = Vec::new();
    let mut spans = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in raw.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(i),
            '}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }

    spans.sort_unstable_by_key(|&(start, _)| start);
    spans
}

/// Map the `excerpts` field to [`Excerpt`]s, dropping items of any other shape.
pub fn normalize_excerpts(payload: &Value) -> Vec<Excerpt> {
    let Some(items) = payload.get("excerpts").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(Excerpt::new(text.as_str())),
            Value::Object(obj) => obj.get("text").and_then(Value::as_str).map(Excerpt::new),
            _ => None,
        })
        .collect()
}

/// JSON schema used by schema-constrained response modes.
pub fn response_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "excerpts": {
                "type": "array",
                "items": { "type": "string" },
                "minItems": MIN_EXCERPTS,
                "maxItems": MAX_EXCERPTS
            }
        },
        "required": ["excerpts"],
        "additionalProperties": false
    })
}

fn preview(raw: &str) -> String {
    const LIMIT: usize = 80;
    match raw.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}
