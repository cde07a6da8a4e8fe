/// Prefix of all versioned routes
pub const API_PREFIX: &str = "/api/v0";

/// Room for multipart framing and text fields on top of the file itself
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Upper bound for dependency checks in `/health`
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// In-flight requests; bounds memory held by buffered upload bodies
pub const HTTP_CONCURRENCY_LIMIT: usize = 64;
