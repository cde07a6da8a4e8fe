//! Domain models for the ingestion pipeline

pub mod job;
pub mod photo;
pub mod upload;
pub mod watermark;

pub use job::{JobPayload, LeaseHandle, MessageState, QueueMessage, QueueStats};
pub use photo::{photo_id_for, NewPhotoRecord, ProcessedPhotoRecord, PHOTO_ID_NAMESPACE};
pub use upload::{
    AcceptedUpload, UploadBatchResult, UploadFailure, UploadFile, UploadProgress, UploadTask,
    ValidationState,
};
pub use watermark::WatermarkPolicy;
