//! Upload acceptance
//!
//! Validates one multipart file, stores the original and enqueues its processing
//! job. Responds as soon as the job is durable; processing happens later.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use proofline_core::UploadFile;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadAcceptedResponse {
    pub id: Uuid,
    pub original_path: String,
    pub message_id: i64,
}

struct UploadForm {
    classroom_id: Uuid,
    file: UploadFile,
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::BadRequest(message.into())
}

fn parse_dimension(name: &str, value: &str) -> Result<u32, ApiError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| bad_request(format!("Field '{}' must be a positive integer", name)))
}

/// Read the `file` part and its companion text fields.
///
/// Exactly one `file` field is accepted.
async fn extract_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut classroom_id: Option<Uuid> = None;
    let mut alt_text: Option<String> = None;
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().map(|s| s.to_string()).unwrap_or_default();
        match name.as_str() {
            "file" => {
                if data.is_some() {
                    return Err(bad_request(
                        "Multiple file fields are not allowed; send exactly one field named 'file'",
                    ));
                }
                file_name = field.file_name().map(|s| s.to_string());
                content_type = field.content_type().map(|s| s.to_string());
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| bad_request(format!("Failed to read file data: {}", e)))?,
                );
            }
            "classroom_id" | "alt_text" | "width" | "height" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read field '{}': {}", name, e)))?;
                match name.as_str() {
                    "classroom_id" => {
                        classroom_id = Some(
                            Uuid::parse_str(value.trim())
                                .map_err(|_| bad_request("Field 'classroom_id' must be a UUID"))?,
                        );
                    }
                    "alt_text" => {
                        let value = value.trim();
                        if !value.is_empty() {
                            alt_text = Some(value.to_string());
                        }
                    }
                    "width" => width = Some(parse_dimension("width", &value)?),
                    _ => height = Some(parse_dimension("height", &value)?),
                }
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    let data = data.ok_or_else(|| bad_request("No file provided"))?;
    let classroom_id = classroom_id.ok_or_else(|| bad_request("Field 'classroom_id' is required"))?;

    let file = UploadFile {
        file_name: file_name.unwrap_or_else(|| "unknown".to_string()),
        content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
        data,
        width,
        height,
        alt_text,
    };

    Ok(UploadForm { classroom_id, file })
}

#[tracing::instrument(skip(state, multipart))]
pub async fn upload_photo(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadAcceptedResponse>), ApiError> {
    let UploadForm { classroom_id, file } = extract_upload_form(multipart).await?;
    let services = &state.services;

    services.uploads.validate(&file)?;
    let accepted = services.producer.accept(classroom_id, &file).await?;

    tracing::info!(
        classroom_id = %classroom_id,
        original_path = %accepted.original_path,
        message_id = accepted.message_id,
        "Upload accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadAcceptedResponse {
            id: accepted.generated_id,
            original_path: accepted.original_path,
            message_id: accepted.message_id,
        }),
    ))
}
