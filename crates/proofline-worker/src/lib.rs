//! Proofline worker
//!
//! Everything between "original stored" and "photo record persisted":
//!
//! - [`JobProducer`]: stores originals, enqueues processing jobs, nudges a worker
//! - [`BatchRunner`]: leases a batch, transforms and finalizes each job, settles leases
//! - [`MetadataFinalizer`]: idempotent record upsert plus cache invalidation
//! - [`Scheduler`]: periodic and wake-driven batch passes until shutdown
//! - [`ChannelWake`]: in-process, coalescing wake trigger

pub mod finalizer;
pub mod producer;
pub mod runner;
pub mod scheduler;
pub mod wake;

pub use finalizer::MetadataFinalizer;
pub use producer::JobProducer;
pub use runner::{BatchReport, BatchRunner, JobOutcome, RunnerConfig};
pub use scheduler::Scheduler;
pub use wake::ChannelWake;
