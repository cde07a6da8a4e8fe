//! HTTP error response conversion
//!
//! Handlers return `Result<_, ApiError>`. Pipeline errors keep their code and
//! retryability in the body so clients can decide whether to try again.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use proofline_core::PipelineError;
use proofline_infra::ErrorResponse;

#[derive(Debug)]
pub enum ApiError {
    Pipeline(PipelineError),
    BadRequest(String),
    Unauthorized,
    /// The endpoint exists but is not configured on this instance
    Disabled(&'static str),
    Internal(anyhow::Error),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

fn pipeline_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
        PipelineError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        PipelineError::StorageConflict(_) => StatusCode::CONFLICT,
        PipelineError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::MissingOriginal(_) => StatusCode::NOT_FOUND,
        PipelineError::TransientIo(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::Encode(_) | PipelineError::WatermarkMissing(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Pipeline(err) => (pipeline_status(err), ErrorResponse::from(err)),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(message.clone(), "BAD_REQUEST", false),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("Invalid or missing credentials", "UNAUTHORIZED", false),
            ),
            ApiError::Disabled(what) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new(format!("{} is not configured", what), "DISABLED", false),
            ),
            ApiError::Internal(err) => {
                tracing::error!(error = %format!("{:#}", err), "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error", "INTERNAL_ERROR", true),
                )
            }
        };

        if status.is_server_error() {
            tracing::error!(status = %status, code = %body.code, error = %body.error, "Request failed");
        } else {
            tracing::debug!(status = %status, code = %body.code, error = %body.error, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_statuses() {
        let cases = [
            (PipelineError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (PipelineError::PayloadTooLarge("x".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (PipelineError::StorageConflict("x".into()), StatusCode::CONFLICT),
            (PipelineError::TransientIo("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (PipelineError::Decode("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (PipelineError::Encode("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
