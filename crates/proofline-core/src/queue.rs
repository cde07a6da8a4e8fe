//! Durable work queue contract
//!
//! At-least-once delivery with lease (visibility-window) semantics. A queue
//! instance is bound to one queue name. Implementations live in `proofline-db`
//! (Postgres and in-memory) and must agree on every rule below:
//!
//! - `enqueue` makes the message visible immediately.
//! - `lease_batch` hands out each visible message to at most one caller, oldest
//!   first, and mints a fresh lease id per delivery.
//! - `archive` and `dead_letter` only take effect for the current lease and only
//!   before its deadline.
//! - An unacknowledged lease simply expires; the message is then visible again.

use std::time::Duration;

use async_trait::async_trait;

use crate::models::{JobPayload, LeaseHandle, QueueMessage, QueueStats};

#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Name this queue instance is bound to
    fn queue_name(&self) -> &str;

    /// Durably append a message; returns its id.
    async fn enqueue(&self, payload: &JobPayload) -> anyhow::Result<i64>;

    /// Lease up to `max_count` visible messages for `visibility`.
    async fn lease_batch(
        &self,
        max_count: usize,
        visibility: Duration,
    ) -> anyhow::Result<Vec<QueueMessage>>;

    /// Acknowledge a message permanently. Returns whether the ack took effect.
    async fn archive(&self, handle: &LeaseHandle) -> anyhow::Result<bool>;

    /// Park a message that can never succeed. Returns whether it took effect.
    async fn dead_letter(&self, handle: &LeaseHandle, reason: &str) -> anyhow::Result<bool>;

    async fn stats(&self) -> anyhow::Result<QueueStats>;
}
