//! Proofline persistence
//!
//! Work queue and photo record repositories. Every repository comes in a Postgres
//! flavour and an in-memory flavour implementing the same `proofline-core`
//! contract, so pipeline tests run against the exact semantics production uses.

pub mod photo;
pub mod pool;
pub mod queue;

pub use photo::{MemoryPhotoRepository, PostgresPhotoRepository};
pub use pool::connect;
pub use queue::{MemoryWorkQueue, PostgresWorkQueue};
