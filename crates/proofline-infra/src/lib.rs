//! Proofline Infrastructure Library
//!
//! Shared infrastructure used by the API server and the service wiring:
//! - Telemetry initialization (tracing subscriber, text or JSON output)
//! - Request ID middleware
//! - HTTP implementations of the pipeline hooks (cache revalidation, worker wake)
//! - Error response body

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

#[cfg(feature = "http-hooks")]
pub mod hooks;

#[cfg(feature = "middleware")]
pub use middleware::{get_request_id, request_id_middleware, RequestId};

#[cfg(feature = "observability-basic")]
pub use telemetry::init_telemetry;

pub use error::ErrorResponse;

#[cfg(feature = "http-hooks")]
pub use hooks::{HttpCacheInvalidator, HttpWakeTrigger};
