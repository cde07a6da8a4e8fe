//! HTTP error response body
//!
//! The `IntoResponse` conversion lives in `proofline-api`; this crate only owns the
//! wire shape so the CLI can decode it too.

use serde::{Deserialize, Serialize};

/// Standard error response format for HTTP APIs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Whether repeating the request can succeed
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>, recoverable: bool) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            recoverable,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&proofline_core::PipelineError> for ErrorResponse {
    fn from(err: &proofline_core::PipelineError) -> Self {
        ErrorResponse::new(err.to_string(), err.error_code(), err.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofline_core::PipelineError;

    #[test]
    fn pipeline_errors_map_to_codes() {
        let body = ErrorResponse::from(&PipelineError::PayloadTooLarge("60MB".into()));
        assert_eq!(body.code, "PAYLOAD_TOO_LARGE");
        assert!(!body.recoverable);

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("details").is_none());
    }
}
