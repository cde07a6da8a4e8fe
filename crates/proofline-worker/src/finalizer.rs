//! Metadata finalizer
//!
//! Called only after both derived blobs are stored, so a record never points at
//! missing renditions.

use std::sync::Arc;

use proofline_core::{CacheInvalidator, FinalizeOutcome, NewPhotoRecord, PhotoStore, PipelineResult};

pub struct MetadataFinalizer {
    photos: Arc<dyn PhotoStore>,
    cache: Arc<dyn CacheInvalidator>,
}

impl MetadataFinalizer {
    pub fn new(photos: Arc<dyn PhotoStore>, cache: Arc<dyn CacheInvalidator>) -> Self {
        Self { photos, cache }
    }

    /// Upsert the record, then invalidate the classroom listing.
    ///
    /// Invalidation failures are logged; the record is already durable and the
    /// storefront cache expires on its own.
    #[tracing::instrument(
        skip(self, record),
        fields(photo_id = %record.id, classroom_id = %record.classroom_id)
    )]
    pub async fn finalize(&self, record: NewPhotoRecord) -> PipelineResult<FinalizeOutcome> {
        let classroom_id = record.classroom_id;
        let outcome = self.photos.upsert(record).await?;

        if outcome.created {
            tracing::info!("Photo record created");
        } else {
            tracing::info!("Photo record updated by redelivered job");
        }

        if let Err(e) = self.cache.invalidate_classrooms(&[classroom_id]).await {
            tracing::warn!(error = %e, "Classroom cache invalidation failed");
        }

        Ok(outcome)
    }

    pub fn photos(&self) -> &Arc<dyn PhotoStore> {
        &self.photos
    }
}
