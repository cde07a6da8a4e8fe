use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proofline_core::{
    Clock, JobPayload, LeaseHandle, MessageState, QueueMessage, QueueStats, SystemClock, WorkQueue,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Entry {
    payload: JobPayload,
    state: MessageState,
    delivery_count: i32,
    enqueued_at: DateTime<Utc>,
}

#[derive(Default)]
struct QueueState {
    next_id: i64,
    messages: BTreeMap<i64, Entry>,
}

/// In-memory work queue
///
/// One mutex-protected state table; every transition happens under the lock, so
/// concurrent `lease_batch` calls are serialized exactly like row locks in the
/// Postgres queue. Time comes from the injected [`Clock`].
pub struct MemoryWorkQueue {
    queue_name: String,
    state: Mutex<QueueState>,
    clock: Arc<dyn Clock>,
}

impl MemoryWorkQueue {
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self::with_clock(queue_name, Arc::new(SystemClock))
    }

    pub fn with_clock(queue_name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            queue_name: queue_name.into(),
            state: Mutex::new(QueueState {
                next_id: 1,
                messages: BTreeMap::new(),
            }),
            clock,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, QueueState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("queue state lock poisoned"))
    }

    /// Current state of a message, if it exists.
    pub fn message_state(&self, message_id: i64) -> Option<MessageState> {
        self.lock()
            .ok()
            .and_then(|state| state.messages.get(&message_id).map(|e| e.state.clone()))
    }

    /// Number of leases handed out for a message so far.
    pub fn delivery_count(&self, message_id: i64) -> Option<i32> {
        self.lock()
            .ok()
            .and_then(|state| state.messages.get(&message_id).map(|e| e.delivery_count))
    }

    fn settle(&self, handle: &LeaseHandle, to: MessageState) -> Result<bool> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        match state.messages.get_mut(&handle.message_id) {
            Some(entry) if entry.state.holds_lease(handle.lease_id, now) => {
                entry.state = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    async fn enqueue(&self, payload: &JobPayload) -> Result<i64> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        let id = state.next_id;
        state.next_id += 1;
        state.messages.insert(
            id,
            Entry {
                payload: payload.clone(),
                state: MessageState::Visible,
                delivery_count: 0,
                enqueued_at: now,
            },
        );
        tracing::debug!(queue = %self.queue_name, message_id = id, "Message enqueued");
        Ok(id)
    }

    async fn lease_batch(&self, max_count: usize, visibility: Duration) -> Result<Vec<QueueMessage>> {
        let now = self.clock.now();
        let deadline = now
            + chrono::Duration::from_std(visibility)
                .map_err(|e| anyhow!("visibility window out of range: {}", e))?;

        let mut state = self.lock()?;
        let mut leased = Vec::new();
        for (&id, entry) in state.messages.iter_mut() {
            if leased.len() >= max_count {
                break;
            }
            if !entry.state.is_leasable(now) {
                continue;
            }

            let lease_id = Uuid::new_v4();
            entry.state = MessageState::Leased { lease_id, deadline };
            entry.delivery_count += 1;

            leased.push(QueueMessage {
                id,
                payload: entry.payload.clone(),
                handle: LeaseHandle {
                    message_id: id,
                    lease_id,
                },
                visibility_deadline: deadline,
                delivery_count: entry.delivery_count,
                enqueued_at: entry.enqueued_at,
            });
        }

        Ok(leased)
    }

    async fn archive(&self, handle: &LeaseHandle) -> Result<bool> {
        let at = self.clock.now();
        self.settle(handle, MessageState::Archived { at })
    }

    async fn dead_letter(&self, handle: &LeaseHandle, reason: &str) -> Result<bool> {
        let at = self.clock.now();
        self.settle(
            handle,
            MessageState::DeadLettered {
                at,
                reason: reason.to_string(),
            },
        )
    }

    async fn stats(&self) -> Result<QueueStats> {
        let now = self.clock.now();
        let state = self.lock()?;
        let mut stats = QueueStats::default();
        for entry in state.messages.values() {
            match &entry.state {
                MessageState::Archived { .. } => stats.archived += 1,
                MessageState::DeadLettered { .. } => stats.dead_lettered += 1,
                s if s.is_leasable(now) => stats.visible += 1,
                _ => stats.leased += 1,
            }
        }
        Ok(stats)
    }
}
