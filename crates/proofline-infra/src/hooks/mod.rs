//! HTTP implementations of the pipeline hooks

mod cache;
mod wake;

pub use cache::HttpCacheInvalidator;
pub use wake::HttpWakeTrigger;

use std::time::Duration;

const HOOK_TIMEOUT: Duration = Duration::from_secs(10);

fn build_client() -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;

    reqwest::Client::builder()
        .timeout(HOOK_TIMEOUT)
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .context("Failed to create HTTP client for hooks")
}
