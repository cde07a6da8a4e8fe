//! Error taxonomy for the ingestion pipeline
//!
//! Every failure that crosses a component boundary (upload orchestrator, worker
//! runner, transformation stage) is expressed as a [`PipelineError`]. The variant
//! decides whether the failure is worth retrying: locally for uploads, through
//! queue redelivery for processing.

use crate::retry::Retryable;

/// Result alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// Bad input (size, type, corrupt content). Reported immediately, never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Network, storage or database hiccup.
    #[error("Transient I/O error: {0}")]
    TransientIo(String),

    /// Name collision in the object store.
    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Corrupt or unreadable image.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Rendition could not be encoded. Input was readable.
    #[error("Encode error: {0}")]
    Encode(String),

    /// Strict watermark policy with no overlay asset available.
    #[error("Watermark asset unavailable: {0}")]
    WatermarkMissing(String),

    /// The original referenced by a job no longer exists.
    #[error("Original not found: {0}")]
    MissingOriginal(String),
}

impl PipelineError {
    /// Whether repeating the same operation can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::TransientIo(_))
    }

    /// Machine-readable code for API and CLI output
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "VALIDATION_ERROR",
            PipelineError::TransientIo(_) => "TRANSIENT_IO_ERROR",
            PipelineError::StorageConflict(_) => "STORAGE_CONFLICT",
            PipelineError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            PipelineError::Decode(_) => "DECODE_ERROR",
            PipelineError::Encode(_) => "ENCODE_ERROR",
            PipelineError::WatermarkMissing(_) => "WATERMARK_MISSING",
            PipelineError::MissingOriginal(_) => "MISSING_ORIGINAL",
        }
    }

    pub fn transient(err: impl std::fmt::Display) -> Self {
        PipelineError::TransientIo(err.to_string())
    }
}

impl Retryable for PipelineError {
    fn is_retryable(&self) -> bool {
        PipelineError::is_retryable(self)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::TransientIo(format!("IO error: {}", err))
    }
}

impl From<anyhow::Error> for PipelineError {
    /// Repository and wiring errors carry no classification; treat them as transient.
    fn from(err: anyhow::Error) -> Self {
        PipelineError::TransientIo(format!("{:#}", err))
    }
}
