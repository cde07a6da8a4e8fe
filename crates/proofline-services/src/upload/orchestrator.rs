//! Batch upload orchestrator
//!
//! Workflow per batch: validate → upload originals (bounded, retried) → enqueue →
//! report progress → one cache invalidation.
//!
//! Validation failures are reported immediately and never retried. Each valid file
//! runs independently under the retry policy; one file's failure never aborts its
//! siblings. Progress is published from the single loop that consumes settled
//! files, so no shared state is needed.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use proofline_core::{
    AcceptedUpload, CacheInvalidator, PipelineError, RetryPolicy, UploadBatchResult,
    UploadConfig, UploadFailure, UploadFile, UploadProgress, UploadTask, ValidationState,
};
use proofline_processing::MediaValidator;
use proofline_worker::JobProducer;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct UploadOrchestratorConfig {
    /// Files uploaded at the same time
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for UploadOrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&UploadConfig> for UploadOrchestratorConfig {
    fn from(config: &UploadConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            retry: config.retry_policy(),
        }
    }
}

type Settled = (UploadTask, Result<AcceptedUpload, UploadFailure>);

pub struct UploadOrchestrator {
    producer: JobProducer,
    validator: Arc<MediaValidator>,
    cache: Arc<dyn CacheInvalidator>,
    config: UploadOrchestratorConfig,
}

impl UploadOrchestrator {
    pub fn new(
        producer: JobProducer,
        validator: Arc<MediaValidator>,
        cache: Arc<dyn CacheInvalidator>,
        config: UploadOrchestratorConfig,
    ) -> Self {
        Self {
            producer,
            validator,
            cache,
            config,
        }
    }

    /// Check one file against the size, type and content rules.
    pub fn validate(&self, file: &UploadFile) -> Result<(), PipelineError> {
        self.validator
            .validate_all(&file.file_name, &file.content_type, &file.data)
            .map_err(PipelineError::from)
    }

    pub async fn upload_batch(
        &self,
        classroom_id: Uuid,
        files: Vec<UploadFile>,
    ) -> UploadBatchResult {
        self.upload_batch_with_progress(classroom_id, files, |_| {})
            .await
    }

    /// Upload a batch of originals for one classroom.
    ///
    /// `on_progress` is called once per file, after it settles.
    #[tracing::instrument(skip(self, files, on_progress), fields(files = files.len()))]
    pub async fn upload_batch_with_progress<F>(
        &self,
        classroom_id: Uuid,
        files: Vec<UploadFile>,
        mut on_progress: F,
    ) -> UploadBatchResult
    where
        F: FnMut(&UploadProgress),
    {
        let total = files.len();
        let mut progress = UploadProgress {
            current_index: 0,
            current_file_name: String::new(),
            uploaded_ids: Vec::new(),
            completed: 0,
            total,
            overall_progress: if total == 0 { 1.0 } else { 0.0 },
        };

        let mut uploads: Vec<(usize, AcceptedUpload)> = Vec::new();
        let mut failures: Vec<(usize, UploadFailure)> = Vec::new();
        let mut settle = |(task, outcome): Settled| {
            progress.current_index = task.index;
            progress.current_file_name = task.file.file_name.clone();
            progress.completed += 1;
            progress.overall_progress = progress.completed as f64 / total as f64;
            match outcome {
                Ok(upload) => {
                    progress.uploaded_ids.push(upload.generated_id);
                    uploads.push((task.index, upload));
                }
                Err(failure) => failures.push((task.index, failure)),
            }
            on_progress(&progress);
        };

        let mut valid = Vec::with_capacity(total);
        for (index, file) in files.into_iter().enumerate() {
            let mut task = UploadTask::new(index, file);
            match self.validate(&task.file) {
                Ok(()) => {
                    task.validation_state = ValidationState::Valid;
                    valid.push(task);
                }
                Err(e) => {
                    tracing::info!(
                        file_name = %task.file.file_name,
                        error = %e,
                        "Rejected file before upload"
                    );
                    task.validation_state = ValidationState::Invalid(e.to_string());
                    let failure = UploadFailure {
                        file_name: task.file.file_name.clone(),
                        message: e.to_string(),
                        retryable: false,
                    };
                    settle((task, Err(failure)));
                }
            }
        }

        let mut in_flight = stream::iter(valid)
            .map(|task| self.upload_one(classroom_id, task))
            .buffer_unordered(self.config.concurrency.max(1));

        while let Some(settled) = in_flight.next().await {
            settle(settled);
        }
        drop(in_flight);
        drop(settle);

        if !uploads.is_empty() {
            if let Err(e) = self.cache.invalidate_classrooms(&[classroom_id]).await {
                tracing::warn!(error = %e, "Classroom cache invalidation failed");
            }
        }

        uploads.sort_by_key(|(index, _)| *index);
        failures.sort_by_key(|(index, _)| *index);
        let result = UploadBatchResult::from_parts(
            uploads.into_iter().map(|(_, u)| u).collect(),
            failures.into_iter().map(|(_, f)| f).collect(),
        );

        tracing::info!(
            classroom_id = %classroom_id,
            uploaded = result.uploaded_count,
            failed = result.failed_count,
            "Upload batch settled"
        );
        result
    }

    async fn upload_one(&self, classroom_id: Uuid, task: UploadTask) -> Settled {
        let outcome = self.store_and_enqueue(classroom_id, &task).await;
        let outcome = outcome.map_err(|(e, attempts)| {
            tracing::warn!(
                file_name = %task.file.file_name,
                attempts,
                error = %e,
                "Upload failed"
            );
            let message = if attempts > 1 {
                format!("{} (after {} attempts)", e, attempts)
            } else {
                e.to_string()
            };
            UploadFailure {
                file_name: task.file.file_name.clone(),
                message,
                retryable: e.is_retryable(),
            }
        });
        (task, outcome)
    }

    async fn store_and_enqueue(
        &self,
        classroom_id: Uuid,
        task: &UploadTask,
    ) -> Result<AcceptedUpload, (PipelineError, u32)> {
        let retry = self.config.retry;
        let original_path = retry
            .run(|attempt| {
                self.producer
                    .store_original(classroom_id, task.generated_id, &task.file, attempt)
            })
            .await?;

        let payload = JobProducer::payload_for(classroom_id, &original_path, &task.file);
        let message_id = match retry.run(|_| self.producer.produce(&payload)).await {
            Ok(id) => id,
            Err(failure) => {
                self.producer.discard_original(&original_path).await;
                return Err(failure);
            }
        };

        Ok(AcceptedUpload {
            generated_id: task.generated_id,
            file_name: task.file.file_name.clone(),
            original_path,
            message_id,
        })
    }
}
