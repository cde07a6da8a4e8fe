//! Hooks for side effects outside the pipeline
//!
//! The pipeline calls these traits at well-defined points (after an upload batch,
//! after a photo is finalized, after a job is enqueued). Deployments plug in HTTP
//! or in-process implementations; the no-op versions keep tests and local runs
//! self-contained.

use async_trait::async_trait;
use uuid::Uuid;

/// Invalidates cached classroom photo listings in the storefront.
///
/// Failures are reported but never fail the operation that triggered them.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate_classrooms(&self, classroom_ids: &[Uuid]) -> Result<(), String>;
}

/// Best-effort nudge asking a worker to run a batch pass now.
///
/// Must never block the caller; the periodic scheduler guarantees eventual
/// processing whether or not any wake is delivered.
pub trait WakeTrigger: Send + Sync {
    fn fire(&self);
}

/// No-op implementation for when no storefront cache is configured
pub struct NoOpCacheInvalidator;

#[async_trait]
impl CacheInvalidator for NoOpCacheInvalidator {
    async fn invalidate_classrooms(&self, _classroom_ids: &[Uuid]) -> Result<(), String> {
        Ok(())
    }
}

pub struct NoOpWakeTrigger;

impl WakeTrigger for NoOpWakeTrigger {
    fn fire(&self) {}
}
