//! Proofline Services Layer
//!
//! Business orchestration on top of the storage, persistence and worker crates:
//! the batch upload orchestrator and the process-wide service wiring. The API and
//! CLI binaries depend on this crate only.

pub mod runtime;
pub mod upload;

pub use runtime::Services;
pub use upload::{UploadOrchestrator, UploadOrchestratorConfig};

pub use proofline_processing::MediaValidator;
pub use proofline_storage::{Storage, StorageError};
pub use proofline_worker::{BatchReport, BatchRunner, JobProducer, Scheduler};
