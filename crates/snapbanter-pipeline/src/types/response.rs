//! Response bodies of the generate-banter endpoint.

use serde::{Deserialize, Serialize};

use snapbanter::Excerpt;

/// Successful generation: excerpt lines in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub excerpts: Vec<String>,
}

impl GenerateResponse {
    pub fn from_excerpts(excerpts: &[Excerpt]) -> Self {
        Self {
            excerpts: excerpts.iter().map(|e| e.text.clone()).collect(),
        }
    }
}

/// Error body returned with every non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_wire_shape() {
        let body = GenerateResponse::from_excerpts(&[Excerpt::new("a"), Excerpt::new("b")]);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "excerpts": ["a", "b"] })
        );
    }

    #[test]
    fn test_error_wire_shape() {
        let body = ErrorBody::new("Missing required field: image_url");
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"error":"Missing required field: image_url"}"#
        );
    }
}
