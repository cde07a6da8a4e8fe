use proofline_api::setup::{initialize_app, server::start_server};
use proofline_core::Config;
use proofline_infra::init_telemetry;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;
    init_telemetry(config.server.log_format)?;

    let app = initialize_app(config.clone()).await?;

    let shutdown = CancellationToken::new();
    let scheduler = tokio::spawn(app.scheduler.run(shutdown.clone()));

    let served = start_server(&config, app.router).await;

    shutdown.cancel();
    if let Err(e) = scheduler.await {
        tracing::error!(error = %e, "Worker scheduler task failed");
    }

    served
}
