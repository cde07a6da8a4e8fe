use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proofline_core::{JobPayload, LeaseHandle, QueueMessage, QueueStats, WorkQueue};
use sqlx::{FromRow, PgPool, Postgres};
use std::time::Duration;
use uuid::Uuid;

#[derive(FromRow)]
struct LeasedRow {
    id: i64,
    payload: serde_json::Value,
    lease_id: Uuid,
    visible_at: DateTime<Utc>,
    delivery_count: i32,
    enqueued_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct StatsRow {
    visible: i64,
    leased: i64,
    archived: i64,
    dead_lettered: i64,
}

/// Postgres-backed work queue bound to one queue name
///
/// Leasing relies on `FOR UPDATE SKIP LOCKED`: concurrent callers skip rows another
/// transaction is claiming, so no message is handed to two consumers at once.
/// Lease deadlines use the database clock.
#[derive(Clone)]
pub struct PostgresWorkQueue {
    pool: PgPool,
    queue_name: String,
}

impl PostgresWorkQueue {
    pub fn new(pool: PgPool, queue_name: impl Into<String>) -> Self {
        Self {
            pool,
            queue_name: queue_name.into(),
        }
    }

    /// Terminal transition shared by archive and dead-letter.
    async fn settle(&self, handle: &LeaseHandle, sql: &str, reason: Option<&str>) -> Result<bool> {
        let mut query = sqlx::query::<Postgres>(sql)
            .bind(handle.message_id)
            .bind(&self.queue_name)
            .bind(handle.lease_id);
        if let Some(reason) = reason {
            query = query.bind(reason);
        }
        let result = query
            .execute(&self.pool)
            .await
            .context("Failed to settle queue message")?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl WorkQueue for PostgresWorkQueue {
    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    #[tracing::instrument(skip(self, payload), fields(queue = %self.queue_name))]
    async fn enqueue(&self, payload: &JobPayload) -> Result<i64> {
        let payload = serde_json::to_value(payload).context("Failed to serialize job payload")?;

        let id: i64 = sqlx::query_scalar::<Postgres, i64>(
            r#"
            INSERT INTO queue_messages (queue_name, payload, state, visible_at)
            VALUES ($1, $2, 'visible', NOW())
            RETURNING id
            "#,
        )
        .bind(&self.queue_name)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .context("Failed to enqueue message")?;

        tracing::debug!(message_id = id, "Message enqueued");
        Ok(id)
    }

    #[tracing::instrument(skip(self), fields(queue = %self.queue_name))]
    async fn lease_batch(&self, max_count: usize, visibility: Duration) -> Result<Vec<QueueMessage>> {
        if max_count == 0 {
            return Ok(Vec::new());
        }

        // An expired lease is as good as visible; a fresh lease_id per delivery
        // invalidates any handle from the previous one.
        let rows: Vec<LeasedRow> = sqlx::query_as::<Postgres, LeasedRow>(
            r#"
            WITH next AS (
                SELECT id
                FROM queue_messages
                WHERE queue_name = $1
                    AND state IN ('visible', 'leased')
                    AND visible_at <= NOW()
                ORDER BY id
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            UPDATE queue_messages q
            SET state = 'leased',
                visible_at = NOW() + make_interval(secs => $3),
                lease_id = gen_random_uuid(),
                delivery_count = q.delivery_count + 1
            FROM next
            WHERE q.id = next.id
            RETURNING q.id, q.payload, q.lease_id, q.visible_at,
                      q.delivery_count, q.enqueued_at
            "#,
        )
        .bind(&self.queue_name)
        .bind(max_count as i64)
        .bind(visibility.as_secs_f64())
        .fetch_all(&self.pool)
        .await
        .context("Failed to lease messages")?;

        let (mut messages, malformed) = decode_rows(rows);
        park_malformed(self, malformed).await;

        // UPDATE ... RETURNING does not preserve the CTE order.
        messages.sort_by_key(|m| m.id);

        tracing::debug!(count = messages.len(), "Leased messages");
        Ok(messages)
    }

    #[tracing::instrument(skip(self), fields(queue = %self.queue_name))]
    async fn archive(&self, handle: &LeaseHandle) -> Result<bool> {
        self.settle(
            handle,
            r#"
            UPDATE queue_messages
            SET state = 'archived', archived_at = NOW(), lease_id = NULL
            WHERE id = $1 AND queue_name = $2 AND lease_id = $3
                AND state = 'leased' AND visible_at > NOW()
            "#,
            None,
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(queue = %self.queue_name))]
    async fn dead_letter(&self, handle: &LeaseHandle, reason: &str) -> Result<bool> {
        self.settle(
            handle,
            r#"
            UPDATE queue_messages
            SET state = 'dead_lettered', dead_lettered_at = NOW(), lease_id = NULL,
                last_error = $4
            WHERE id = $1 AND queue_name = $2 AND lease_id = $3
                AND state = 'leased' AND visible_at > NOW()
            "#,
            Some(reason),
        )
        .await
    }

    async fn stats(&self) -> Result<QueueStats> {
        let row: StatsRow = sqlx::query_as::<Postgres, StatsRow>(
            r#"
            SELECT
                COUNT(*) FILTER (
                    WHERE state = 'visible' OR (state = 'leased' AND visible_at <= NOW())
                ) AS visible,
                COUNT(*) FILTER (WHERE state = 'leased' AND visible_at > NOW()) AS leased,
                COUNT(*) FILTER (WHERE state = 'archived') AS archived,
                COUNT(*) FILTER (WHERE state = 'dead_lettered') AS dead_lettered
            FROM queue_messages
            WHERE queue_name = $1
            "#,
        )
        .bind(&self.queue_name)
        .fetch_one(&self.pool)
        .await
        .context("Failed to load queue stats")?;

        Ok(QueueStats {
            visible: row.visible.max(0) as u64,
            leased: row.leased.max(0) as u64,
            archived: row.archived.max(0) as u64,
            dead_lettered: row.dead_lettered.max(0) as u64,
        })
    }
}

/// Split leased rows into deliverable messages and rows whose payload can never be processed.
fn decode_rows(rows: Vec<LeasedRow>) -> (Vec<QueueMessage>, Vec<(LeaseHandle, String)>) {
    let mut messages = Vec::with_capacity(rows.len());
    let mut malformed = Vec::new();
    for row in rows {
        let handle = LeaseHandle {
            message_id: row.id,
            lease_id: row.lease_id,
        };
        match serde_json::from_value::<JobPayload>(row.payload) {
            Ok(payload) => messages.push(QueueMessage {
                id: row.id,
                payload,
                handle,
                visibility_deadline: row.visible_at,
                delivery_count: row.delivery_count,
                enqueued_at: row.enqueued_at,
            }),
            Err(e) => {
                tracing::error!(message_id = row.id, error = %e, "Malformed job payload");
                malformed.push((handle, format!("malformed payload: {}", e)));
            }
        }
    }
    (messages, malformed)
}

/// Dead-letter malformed deliveries so they are not redelivered forever.
///
/// Failures are logged only: the rest of the batch is already leased and must
/// still reach the caller. A row that could not be parked comes back after its
/// lease expires and is tried again.
async fn park_malformed<Q: WorkQueue + ?Sized>(queue: &Q, malformed: Vec<(LeaseHandle, String)>) {
    for (handle, reason) in malformed {
        if let Err(e) = queue.dead_letter(&handle, &reason).await {
            tracing::warn!(
                message_id = handle.message_id,
                error = %e,
                "Failed to dead-letter malformed job payload"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn row(id: i64, payload: serde_json::Value) -> LeasedRow {
        let now = Utc::now();
        LeasedRow {
            id,
            payload,
            lease_id: Uuid::new_v4(),
            visible_at: now,
            delivery_count: 1,
            enqueued_at: now,
        }
    }

    fn valid_payload() -> serde_json::Value {
        serde_json::json!({
            "original_path": "originals/a.jpg",
            "classroom_id": Uuid::new_v4(),
        })
    }

    /// Queue whose dead-letter path is down; records what it was asked to park.
    #[derive(Default)]
    struct DeadLetterDown {
        attempts: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl WorkQueue for DeadLetterDown {
        fn queue_name(&self) -> &str {
            "photos"
        }

        async fn enqueue(&self, _payload: &JobPayload) -> Result<i64> {
            anyhow::bail!("not used")
        }

        async fn lease_batch(&self, _max: usize, _visibility: Duration) -> Result<Vec<QueueMessage>> {
            Ok(Vec::new())
        }

        async fn archive(&self, _handle: &LeaseHandle) -> Result<bool> {
            Ok(false)
        }

        async fn dead_letter(&self, handle: &LeaseHandle, _reason: &str) -> Result<bool> {
            self.attempts.lock().unwrap().push(handle.message_id);
            anyhow::bail!("connection reset")
        }

        async fn stats(&self) -> Result<QueueStats> {
            Ok(QueueStats::default())
        }
    }

    #[test]
    fn test_malformed_rows_do_not_hide_valid_ones() {
        let rows = vec![
            row(3, valid_payload()),
            row(1, serde_json::json!({"unexpected": true})),
            row(2, valid_payload()),
        ];

        let (messages, malformed) = decode_rows(rows);

        let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(malformed.len(), 1);
        assert_eq!(malformed[0].0.message_id, 1);
        assert!(malformed[0].1.starts_with("malformed payload:"));
    }

    #[tokio::test]
    async fn test_failed_dead_letter_keeps_parking_the_rest() {
        let queue = DeadLetterDown::default();
        let malformed = vec![
            (LeaseHandle { message_id: 1, lease_id: Uuid::new_v4() }, "bad".to_string()),
            (LeaseHandle { message_id: 4, lease_id: Uuid::new_v4() }, "bad".to_string()),
        ];

        park_malformed(&queue, malformed).await;

        assert_eq!(*queue.attempts.lock().unwrap(), vec![1, 4]);
    }
}
