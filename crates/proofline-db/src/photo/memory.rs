use anyhow::{anyhow, Result};
use async_trait::async_trait;
use proofline_core::{
    Clock, FinalizeOutcome, NewPhotoRecord, PhotoStore, ProcessedPhotoRecord, SystemClock,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// In-memory photo records keyed by deterministic photo id
pub struct MemoryPhotoRepository {
    records: RwLock<HashMap<Uuid, ProcessedPhotoRecord>>,
    clock: Arc<dyn Clock>,
}

impl MemoryPhotoRepository {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryPhotoRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoRepository {
    async fn upsert(&self, record: NewPhotoRecord) -> Result<FinalizeOutcome> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("photo records lock poisoned"))?;

        let (created_at, created) = match records.get(&record.id) {
            Some(existing) => (existing.created_at, false),
            None => (self.clock.now(), true),
        };
        let stored = record.into_record(created_at);
        records.insert(stored.id, stored.clone());

        Ok(FinalizeOutcome {
            record: stored,
            created,
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<ProcessedPhotoRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("photo records lock poisoned"))?;
        Ok(records.get(&id).cloned())
    }

    async fn list_by_classroom(&self, classroom_id: Uuid) -> Result<Vec<ProcessedPhotoRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("photo records lock poisoned"))?;
        let mut photos: Vec<ProcessedPhotoRecord> = records
            .values()
            .filter(|r| r.classroom_id == classroom_id)
            .cloned()
            .collect();
        photos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(photos)
    }
}
