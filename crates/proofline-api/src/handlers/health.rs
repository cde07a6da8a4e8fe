//! Health check handler

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use proofline_core::QueueStats;
use serde::Serialize;

use crate::constants::HEALTH_CHECK_TIMEOUT_SECS;
use crate::state::AppState;

/// Run an async check with timeout.
async fn run_check<T, F, E>(timeout: Duration, f: F, error_prefix: &str) -> Result<T, String>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{}: {}", error_prefix, e)),
        Err(_) => Err("timeout".to_string()),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage_backend: String,
    pub queue: String,
    pub queue_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_stats: Option<QueueStats>,
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let services = &state.services;
    let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

    let stats = run_check(timeout, services.queue.stats(), "queue error").await;
    let (queue, queue_stats) = match stats {
        Ok(stats) => ("healthy".to_string(), Some(stats)),
        Err(e) => {
            tracing::warn!(error = %e, "Queue health check failed");
            (e, None)
        }
    };

    let healthy = queue_stats.is_some();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            storage_backend: services.storage.backend_type().to_string(),
            queue,
            queue_name: services.queue.queue_name().to_string(),
            queue_stats,
        }),
    )
}
