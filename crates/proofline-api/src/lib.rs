//! Proofline API Library
//!
//! HTTP surface of the ingestion pipeline: upload acceptance, the worker
//! invocation endpoint, classroom photo listings and health.

pub mod constants;
pub mod error;
mod handlers;
pub mod setup;
pub mod state;

pub use error::ApiError;
pub use state::AppState;
