//! Job producer
//!
//! Records an original durably, then enqueues the job that will process it. The
//! wake that follows is best effort; the scheduler picks the job up either way.

use std::sync::Arc;

use proofline_core::{
    AcceptedUpload, JobPayload, PipelineError, PipelineResult, UploadFile, WakeTrigger, WorkQueue,
};
use proofline_storage::keys::{extension_for_content_type, original_key};
use proofline_storage::Storage;
use uuid::Uuid;

#[derive(Clone)]
pub struct JobProducer {
    storage: Arc<dyn Storage>,
    queue: Arc<dyn WorkQueue>,
    wake: Arc<dyn WakeTrigger>,
}

impl JobProducer {
    pub fn new(
        storage: Arc<dyn Storage>,
        queue: Arc<dyn WorkQueue>,
        wake: Arc<dyn WakeTrigger>,
    ) -> Self {
        Self {
            storage,
            queue,
            wake,
        }
    }

    /// Write an original under its collision-resistant path.
    ///
    /// The path is derived from `upload_id`, so callers retrying a transient failure
    /// must reuse the same id. The first attempt refuses to replace an existing
    /// object. A retry (`attempt > 1`) can only find an earlier attempt of the same
    /// upload at that path, possibly incomplete, and rewrites it.
    #[tracing::instrument(
        skip(self, file),
        fields(file_name = %file.file_name, size = file.size())
    )]
    pub async fn store_original(
        &self,
        classroom_id: Uuid,
        upload_id: Uuid,
        file: &UploadFile,
        attempt: u32,
    ) -> PipelineResult<String> {
        let extension = extension_for_content_type(&file.content_type).ok_or_else(|| {
            PipelineError::Validation(format!(
                "Content type {} is not allowed",
                file.content_type
            ))
        })?;
        let path = original_key(classroom_id, upload_id, extension);
        let overwrite = attempt > 1;

        let stored = self
            .storage
            .upload(&path, file.data.clone(), &file.content_type, overwrite)
            .await?;
        Ok(stored)
    }

    /// Best-effort removal of an original whose job could not be enqueued.
    pub async fn discard_original(&self, original_path: &str) {
        match self.storage.delete(&[original_path.to_string()]).await {
            Ok(()) => {
                tracing::info!(original_path, "Discarded original without a job");
            }
            Err(e) => {
                tracing::warn!(
                    original_path,
                    error = %e,
                    "Failed to discard original without a job"
                );
            }
        }
    }

    /// Enqueue a processing job and wake a worker.
    #[tracing::instrument(skip(self, payload), fields(original_path = %payload.original_path))]
    pub async fn produce(&self, payload: &JobPayload) -> PipelineResult<i64> {
        let message_id = self.queue.enqueue(payload).await.map_err(|e| {
            tracing::error!(error = %e, queue = self.queue.queue_name(), "Failed to enqueue job");
            PipelineError::transient(format!("Failed to enqueue job: {:#}", e))
        })?;

        tracing::info!(
            message_id,
            classroom_id = %payload.classroom_id,
            queue = self.queue.queue_name(),
            "Processing job enqueued"
        );

        self.wake.fire();
        Ok(message_id)
    }

    /// Store the original and enqueue its job in one go, without local retries.
    ///
    /// Used by the upload endpoint, where the client owns retrying.
    pub async fn accept(
        &self,
        classroom_id: Uuid,
        file: &UploadFile,
    ) -> PipelineResult<AcceptedUpload> {
        let upload_id = Uuid::new_v4();
        let original_path = self
            .store_original(classroom_id, upload_id, file, 1)
            .await?;
        let payload = Self::payload_for(classroom_id, &original_path, file);
        let message_id = match self.produce(&payload).await {
            Ok(id) => id,
            Err(e) => {
                self.discard_original(&original_path).await;
                return Err(e);
            }
        };

        Ok(AcceptedUpload {
            generated_id: upload_id,
            file_name: file.file_name.clone(),
            original_path,
            message_id,
        })
    }

    pub fn payload_for(classroom_id: Uuid, original_path: &str, file: &UploadFile) -> JobPayload {
        JobPayload {
            original_path: original_path.to_string(),
            classroom_id,
            width: file.width,
            height: file.height,
            alt_text: file.alt_text.clone(),
        }
    }
}
