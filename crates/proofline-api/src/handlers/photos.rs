use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use proofline_core::ProcessedPhotoRecord;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Fields exposed to the storefront. The original path stays internal.
#[derive(Debug, Serialize)]
pub struct PhotoResponse {
    pub id: Uuid,
    pub classroom_id: Uuid,
    pub watermarked_url: String,
    pub thumbnail_url: String,
    pub width: u32,
    pub height: u32,
    pub file_size_bytes: u64,
    pub mime_type: String,
    pub alt_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ProcessedPhotoRecord> for PhotoResponse {
    fn from(record: ProcessedPhotoRecord) -> Self {
        Self {
            id: record.id,
            classroom_id: record.classroom_id,
            watermarked_url: record.watermarked_url,
            thumbnail_url: record.thumbnail_url,
            width: record.width,
            height: record.height,
            file_size_bytes: record.file_size_bytes,
            mime_type: record.mime_type,
            alt_text: record.alt_text,
            created_at: record.created_at,
        }
    }
}

pub async fn list_classroom_photos(
    State(state): State<AppState>,
    Path(classroom_id): Path<Uuid>,
) -> Result<Json<Vec<PhotoResponse>>, ApiError> {
    let records = state
        .services
        .photos
        .list_by_classroom(classroom_id)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(records.into_iter().map(PhotoResponse::from).collect()))
}
