//! Application setup: service wiring, router and server lifecycle

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use proofline_core::Config;
use proofline_services::{Scheduler, Services};

use crate::state::AppState;

/// Everything `main` needs to run the process
pub struct App {
    pub state: AppState,
    pub router: Router,
    pub scheduler: Scheduler,
}

/// Build services, the background scheduler and the router.
pub async fn initialize_app(config: Config) -> Result<App> {
    let mut services = Services::from_config(config).await?;
    let scheduler = services.scheduler();

    let state = AppState::new(Arc::new(services));
    let router = routes::build_router(state.clone());

    Ok(App {
        state,
        router,
        scheduler,
    })
}
