//! Worker batch runner
//!
//! One invocation leases up to `batch_size` messages and processes them
//! concurrently. Each job downloads its original, runs the transformation stage
//! on the blocking pool, writes both derived blobs to deterministic paths and
//! finalizes the record. Leases are then settled:
//!
//! - success: archive
//! - permanent error, or `delivery_count >= max_deliveries`: dead-letter
//! - transient error: nothing; the lease lapses and the message is redelivered
//!
//! The concurrency bound lives on the runner, so overlapping invocations (the
//! scheduler and the HTTP endpoint) share it.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use proofline_core::{
    photo_id_for, ImageConfig, NewPhotoRecord, PipelineError, PipelineResult, QueueMessage,
    WorkQueue, WorkerConfig,
};
use proofline_processing::{ImageTransformer, TransformOptions};
use proofline_storage::keys::{thumbnail_key, watermarked_key};
use proofline_storage::{Storage, StorageError};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};

use crate::finalizer::MetadataFinalizer;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub batch_size: usize,
    pub visibility: Duration,
    pub concurrency: usize,
    pub max_deliveries: i32,
    pub watermark_asset_path: String,
    pub transform: TransformOptions,
}

impl RunnerConfig {
    pub fn from_config(worker: &WorkerConfig, image: &ImageConfig) -> Self {
        Self {
            batch_size: worker.batch_size,
            visibility: worker.visibility,
            concurrency: worker.concurrency,
            max_deliveries: worker.max_deliveries,
            watermark_asset_path: image.watermark_asset_path.clone(),
            transform: TransformOptions::from(image),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            visibility: Duration::from_secs(300),
            concurrency: 50,
            max_deliveries: 5,
            watermark_asset_path: "watermarks/proof.png".to_string(),
            transform: TransformOptions::default(),
        }
    }
}

/// Counts for one batch pass.
///
/// `processed_count = success_count + failure_count`; dead-lettered jobs are
/// failures and are also counted in `dead_lettered_count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub processed_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub dead_lettered_count: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: JobOutcome) {
        self.processed_count += 1;
        match outcome {
            JobOutcome::Archived | JobOutcome::LeaseLost => self.success_count += 1,
            JobOutcome::Retrying => self.failure_count += 1,
            JobOutcome::DeadLettered => {
                self.failure_count += 1;
                self.dead_lettered_count += 1;
            }
        }
    }
}

/// How a single leased message was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Archived,
    /// Processing succeeded but the lease expired before the ack; the message
    /// will be redelivered and re-finalized idempotently.
    LeaseLost,
    /// Transient failure, left for redelivery
    Retrying,
    DeadLettered,
}

#[derive(Clone)]
pub struct BatchRunner {
    queue: Arc<dyn WorkQueue>,
    storage: Arc<dyn Storage>,
    finalizer: Arc<MetadataFinalizer>,
    config: Arc<RunnerConfig>,
    permits: Arc<Semaphore>,
}

impl BatchRunner {
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        storage: Arc<dyn Storage>,
        finalizer: Arc<MetadataFinalizer>,
        config: RunnerConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            queue,
            storage,
            finalizer,
            config: Arc::new(config),
            permits,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<dyn WorkQueue> {
        &self.queue
    }

    /// Run one pass on its own task.
    ///
    /// Dropping the handle does not cancel the pass, so a caller that goes away
    /// (an HTTP client hanging up) never strands leased jobs.
    pub fn spawn_batch(&self) -> JoinHandle<anyhow::Result<BatchReport>> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run_batch().await })
    }

    /// Lease one batch and settle every message in it.
    ///
    /// Only a failure to lease is returned as an error; per-job failures are
    /// reflected in the report.
    #[tracing::instrument(skip(self), fields(queue = self.queue.queue_name()))]
    pub async fn run_batch(&self) -> anyhow::Result<BatchReport> {
        let messages = self
            .queue
            .lease_batch(self.config.batch_size, self.config.visibility)
            .await?;

        let mut report = BatchReport::default();
        if messages.is_empty() {
            tracing::debug!("No messages to process");
            return Ok(report);
        }

        tracing::info!(leased = messages.len(), "Processing batch");

        let watermark_asset = self.load_watermark_asset().await;

        let mut jobs = JoinSet::new();
        for message in messages {
            let runner = self.clone();
            let asset = watermark_asset.clone();
            jobs.spawn(async move { runner.handle(message, asset).await });
        }

        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    tracing::error!(error = %e, "Job task aborted, lease will lapse");
                    report.record(JobOutcome::Retrying);
                }
            }
        }

        tracing::info!(
            processed = report.processed_count,
            succeeded = report.success_count,
            failed = report.failure_count,
            dead_lettered = report.dead_lettered_count,
            "Batch complete"
        );
        Ok(report)
    }

    /// Load the overlay once per batch; absence is not an error here.
    async fn load_watermark_asset(&self) -> PipelineResult<Option<Bytes>> {
        match self.storage.download(&self.config.watermark_asset_path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(StorageError::NotFound(_)) => {
                tracing::warn!(
                    path = %self.config.watermark_asset_path,
                    "Watermark asset not found"
                );
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load watermark asset");
                Err(e.into())
            }
        }
    }

    async fn handle(
        &self,
        message: QueueMessage,
        watermark_asset: PipelineResult<Option<Bytes>>,
    ) -> JobOutcome {
        let message_id = message.id;
        let delivery_count = message.delivery_count;
        let max_deliveries = self.config.max_deliveries;

        // Deliveries past the limit mean earlier attempts died without settling.
        if delivery_count > max_deliveries {
            let reason = format!(
                "Exceeded {} deliveries without completing",
                max_deliveries
            );
            return self.dead_letter(&message, &reason).await;
        }

        let result = match self.permits.acquire().await {
            Ok(_permit) => self.process(&message, watermark_asset).await,
            Err(e) => Err(PipelineError::transient(format!("worker closed: {}", e))),
        };

        match result {
            Ok(()) => match self.queue.archive(&message.handle).await {
                Ok(true) => JobOutcome::Archived,
                Ok(false) => {
                    tracing::warn!(
                        message_id,
                        "Lease expired before archive, message will be redelivered"
                    );
                    JobOutcome::LeaseLost
                }
                Err(e) => {
                    tracing::error!(message_id, error = %e, "Failed to archive message");
                    JobOutcome::Retrying
                }
            },
            Err(e) if !e.is_retryable() => {
                tracing::error!(
                    message_id,
                    error = %e,
                    code = e.error_code(),
                    original_path = %message.payload.original_path,
                    "Permanent processing failure"
                );
                self.dead_letter(&message, &e.to_string()).await
            }
            Err(e) if delivery_count >= max_deliveries => {
                tracing::error!(
                    message_id,
                    delivery_count,
                    error = %e,
                    "Transient failure on final delivery"
                );
                let reason = format!("Gave up after {} deliveries: {}", delivery_count, e);
                self.dead_letter(&message, &reason).await
            }
            Err(e) => {
                tracing::warn!(
                    message_id,
                    delivery_count,
                    max_deliveries,
                    error = %e,
                    "Transient processing failure, leaving for redelivery"
                );
                JobOutcome::Retrying
            }
        }
    }

    async fn dead_letter(&self, message: &QueueMessage, reason: &str) -> JobOutcome {
        match self.queue.dead_letter(&message.handle, reason).await {
            Ok(true) => {
                tracing::warn!(message_id = message.id, reason, "Message dead-lettered");
                JobOutcome::DeadLettered
            }
            Ok(false) => {
                tracing::warn!(
                    message_id = message.id,
                    "Lease expired before dead-letter, message will be redelivered"
                );
                JobOutcome::Retrying
            }
            Err(e) => {
                tracing::error!(message_id = message.id, error = %e, "Failed to dead-letter message");
                JobOutcome::Retrying
            }
        }
    }

    #[tracing::instrument(
        skip(self, message, watermark_asset),
        fields(
            message_id = message.id,
            delivery = message.delivery_count,
            original_path = %message.payload.original_path
        )
    )]
    async fn process(
        &self,
        message: &QueueMessage,
        watermark_asset: PipelineResult<Option<Bytes>>,
    ) -> PipelineResult<()> {
        let payload = &message.payload;
        let watermark_asset = watermark_asset?;
        let original = self.storage.download(&payload.original_path).await?;

        let options = self.config.transform.clone();
        let output = tokio::task::spawn_blocking(move || {
            ImageTransformer::transform(&original, watermark_asset.as_deref(), &options)
        })
        .await
        .map_err(|e| PipelineError::transient(format!("transform task failed: {}", e)))??;

        let photo_id = photo_id_for(&payload.original_path);
        let processed_path = watermarked_key(payload.classroom_id, photo_id);
        let thumbnail_path = thumbnail_key(payload.classroom_id, photo_id);

        let (processed_path, thumbnail_path) = tokio::try_join!(
            self.storage
                .upload(&processed_path, output.processed.clone(), output.mime_type, true),
            self.storage
                .upload(&thumbnail_path, output.thumbnail.clone(), output.mime_type, true),
        )?;

        if let (Some(w), Some(h)) = (payload.width, payload.height) {
            if (w, h) != (output.width, output.height) {
                tracing::debug!(
                    reported_width = w,
                    reported_height = h,
                    width = output.width,
                    height = output.height,
                    "Reported dimensions differ from processed rendition"
                );
            }
        }

        let record = NewPhotoRecord {
            id: photo_id,
            classroom_id: payload.classroom_id,
            original_path: payload.original_path.clone(),
            watermarked_url: self.storage.public_url(&processed_path),
            thumbnail_url: self.storage.public_url(&thumbnail_path),
            width: output.width,
            height: output.height,
            file_size_bytes: output.byte_size,
            mime_type: output.mime_type.to_string(),
            alt_text: payload.alt_text.clone(),
        };

        self.finalizer.finalize(record).await?;

        tracing::info!(
            photo_id = %photo_id,
            width = output.width,
            height = output.height,
            watermarked = output.watermarked,
            "Photo processed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts_dead_letters_as_failures() {
        let mut report = BatchReport::default();
        report.record(JobOutcome::Archived);
        report.record(JobOutcome::LeaseLost);
        report.record(JobOutcome::Retrying);
        report.record(JobOutcome::DeadLettered);

        assert_eq!(
            report,
            BatchReport {
                processed_count: 4,
                success_count: 2,
                failure_count: 2,
                dead_lettered_count: 1,
            }
        );
    }

    #[test]
    fn runner_config_follows_worker_and_image_sections() {
        let config = proofline_core::Config::from_map(&Default::default()).unwrap();
        let runner = RunnerConfig::from_config(&config.worker, &config.image);
        assert_eq!(runner.batch_size, 10);
        assert_eq!(runner.visibility, Duration::from_secs(300));
        assert_eq!(runner.concurrency, 50);
        assert_eq!(runner.max_deliveries, 5);
        assert_eq!(runner.transform.max_width, 1500);
        assert_eq!(runner.watermark_asset_path, "watermarks/proof.png");
    }
}
