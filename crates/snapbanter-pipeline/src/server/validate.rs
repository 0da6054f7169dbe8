//! Validation of generate-banter request bodies.

use serde_json::Value;

use crate::types::{GenerateRequest, PipelineError, PipelineResult};

pub const INVALID_JSON: &str = "Invalid JSON in request body";
pub const MISSING_IMAGE_URL: &str = "Missing required field: image_url";

/// Parse a raw request body, rejecting it before any generation work.
pub fn validate_request(body: &[u8]) -> PipelineResult<GenerateRequest> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| PipelineError::Validation(INVALID_JSON.to_string()))?;

    match value.get("image_url").and_then(Value::as_str) {
        Some(url) if !url.trim().is_empty() => Ok(GenerateRequest::new(url)),
        _ => Err(PipelineError::Validation(MISSING_IMAGE_URL.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejection(body: &[u8]) -> String {
        validate_request(body).unwrap_err().to_string()
    }

    #[test]
    fn test_valid_request() {
        let req = validate_request(br#"{"image_url":"https://cdn/a.jpg"}"#).unwrap();
        assert_eq!(req.image_url, "https://cdn/a.jpg");
    }

    #[test]
    fn test_missing_image_url() {
        assert_eq!(rejection(b"{}"), MISSING_IMAGE_URL);
        assert_eq!(rejection(br#"{"image_url":""}"#), MISSING_IMAGE_URL);
        assert_eq!(rejection(br#"{"image_url":42}"#), MISSING_IMAGE_URL);
        assert_eq!(rejection(br#"{"imageUrl":"https://cdn/a.jpg"}"#), MISSING_IMAGE_URL);
    }

    #[test]
    fn test_invalid_json() {
        assert_eq!(rejection(b"image_url=https://cdn/a.jpg"), INVALID_JSON);
        assert_eq!(rejection(b""), INVALID_JSON);
    }

    #[test]
    fn test_rejections_are_bad_requests() {
        assert_eq!(validate_request(b"{}").unwrap_err().status_code(), 400);
    }
}
