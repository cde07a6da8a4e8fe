//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use proofline_core::PipelineError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Object too large: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::UploadFailed(_)
                | StorageError::DownloadFailed(_)
                | StorageError::DeleteFailed(_)
                | StorageError::BackendError(_)
                | StorageError::IoError(_)
        )
    }
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => PipelineError::MissingOriginal(key),
            StorageError::AlreadyExists(key) => PipelineError::StorageConflict(key),
            StorageError::PayloadTooLarge(msg) => PipelineError::PayloadTooLarge(msg),
            StorageError::InvalidKey(msg) => PipelineError::Validation(msg),
            other => PipelineError::TransientIo(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem, memory) implement this trait so the
/// orchestrator, producer and worker never couple to a specific backend.
///
/// **Key format:** see the crate root documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `path` and return the path.
    ///
    /// With `overwrite = false` an existing object fails with
    /// [`StorageError::AlreadyExists`]; with `overwrite = true` it is replaced.
    async fn upload(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
        overwrite: bool,
    ) -> StorageResult<String>;

    /// Download an object by its path
    async fn download(&self, path: &str) -> StorageResult<Bytes>;

    /// Publicly reachable URL for `path`. Does not check existence.
    fn public_url(&self, path: &str) -> String;

    /// Delete objects. Missing paths are ignored.
    async fn delete(&self, paths: &[String]) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
