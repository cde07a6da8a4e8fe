//! Proofline Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and the
//! contracts (queue, photo store, hooks) shared by every Proofline component.
//! Backends live in `proofline-storage` and `proofline-db`; orchestration lives in
//! `proofline-worker` and `proofline-services`.

pub mod clock;
pub mod config;
pub mod error;
pub mod hooks;
pub mod models;
pub mod photo_store;
pub mod queue;
pub mod retry;
pub mod storage_types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    Config, ConfigError, DatabaseConfig, HooksConfig, ImageConfig, LogFormat, ServerConfig,
    StorageConfig, UploadConfig, WorkerConfig,
};
pub use error::{PipelineError, PipelineResult};
pub use hooks::{CacheInvalidator, NoOpCacheInvalidator, NoOpWakeTrigger, WakeTrigger};
pub use models::{
    photo_id_for, AcceptedUpload, JobPayload, LeaseHandle, MessageState, NewPhotoRecord,
    ProcessedPhotoRecord, QueueMessage, QueueStats, UploadBatchResult, UploadFailure, UploadFile,
    UploadProgress, UploadTask, ValidationState, WatermarkPolicy,
};
pub use photo_store::{FinalizeOutcome, PhotoStore};
pub use queue::WorkQueue;
pub use retry::{Backoff, RetryPolicy, Retryable};
pub use storage_types::{PersistenceBackend, StorageBackend};
