//! Client-side upload models

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A file selected for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub alt_text: Option<String>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
            width: None,
            height: None,
            alt_text: None,
        }
    }

    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = Some(alt_text.into());
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ValidationState {
    Pending,
    Valid,
    Invalid(String),
}

/// One file's journey through the orchestrator
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub index: usize,
    pub file: UploadFile,
    pub generated_id: Uuid,
    pub validation_state: ValidationState,
}

impl UploadTask {
    pub fn new(index: usize, file: UploadFile) -> Self {
        Self {
            index,
            file,
            generated_id: Uuid::new_v4(),
            validation_state: ValidationState::Pending,
        }
    }
}

/// An original that is durably stored and has a processing job enqueued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedUpload {
    pub generated_id: Uuid,
    pub file_name: String,
    pub original_path: String,
    pub message_id: i64,
}

/// Snapshot published after each file settles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub current_index: usize,
    pub current_file_name: String,
    pub uploaded_ids: Vec<Uuid>,
    pub completed: usize,
    pub total: usize,
    /// `completed / total`, in `0.0..=1.0`
    pub overall_progress: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFailure {
    pub file_name: String,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadBatchResult {
    pub success: bool,
    pub uploaded_count: usize,
    pub failed_count: usize,
    pub uploaded_ids: Vec<Uuid>,
    pub uploads: Vec<AcceptedUpload>,
    pub errors: Vec<UploadFailure>,
}

impl UploadBatchResult {
    pub fn from_parts(uploads: Vec<AcceptedUpload>, errors: Vec<UploadFailure>) -> Self {
        let uploaded_ids = uploads.iter().map(|u| u.generated_id).collect();
        Self {
            success: errors.is_empty(),
            uploaded_count: uploads.len(),
            failed_count: errors.len(),
            uploaded_ids,
            uploads,
            errors,
        }
    }
}
