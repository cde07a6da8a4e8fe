mod orchestrator;

pub use orchestrator::{UploadOrchestrator, UploadOrchestratorConfig};
