use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use proofline_infra::request_id_middleware;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::constants::{API_PREFIX, HTTP_CONCURRENCY_LIMIT, MULTIPART_OVERHEAD_BYTES};
use crate::handlers::{health, photos, uploads, worker};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.services.config.upload.max_size_bytes + MULTIPART_OVERHEAD_BYTES;

    let api = Router::new()
        .route("/uploads", post(uploads::upload_photo))
        .route("/worker/run", post(worker::run_worker))
        .route(
            "/classrooms/{classroom_id}/photos",
            get(photos::list_classroom_photos),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .nest(API_PREFIX, api)
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(setup_cors())
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}

fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
