//! Worker invocation endpoint

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use proofline_services::BatchReport;
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

/// Constant-time string comparison to prevent timing attacks.
fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Run one batch pass.
///
/// Requires `Authorization: Bearer <WORKER_SECRET>`. Without a configured secret
/// every caller is rejected. The pass runs to completion even if the caller
/// disconnects.
pub async fn run_worker(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BatchReport>, ApiError> {
    let secret = state
        .services
        .config
        .worker
        .secret
        .as_deref()
        .ok_or_else(|| {
            tracing::warn!("Worker invocation rejected: WORKER_SECRET is not set");
            ApiError::Unauthorized
        })?;

    match bearer_token(&headers) {
        Some(token) if secure_compare(token, secret) => {}
        _ => return Err(ApiError::Unauthorized),
    }

    // Detached so a caller hanging up mid-pass does not abort leased jobs.
    let report = state
        .services
        .runner
        .spawn_batch()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Batch task failed: {}", e)))??;
    tracing::info!(
        processed = report.processed_count,
        succeeded = report.success_count,
        failed = report.failure_count,
        dead_lettered = report.dead_lettered_count,
        "Worker invocation finished"
    );

    Ok(Json(report))
}
