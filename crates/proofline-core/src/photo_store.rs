//! Persisted photo records

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{NewPhotoRecord, ProcessedPhotoRecord};

/// Result of an idempotent finalize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub record: ProcessedPhotoRecord,
    /// `false` when a redelivered job updated an existing record
    pub created: bool,
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Insert or update the record keyed by `record.id`, preserving `created_at`.
    async fn upsert(&self, record: NewPhotoRecord) -> anyhow::Result<FinalizeOutcome>;

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<ProcessedPhotoRecord>>;

    /// Records for a classroom, newest first
    async fn list_by_classroom(&self, classroom_id: Uuid)
        -> anyhow::Result<Vec<ProcessedPhotoRecord>>;
}
