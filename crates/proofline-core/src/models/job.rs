//! Queue message model
//!
//! A message moves through an explicit state machine:
//!
//! ```text
//! Visible ──lease──▶ Leased{deadline} ──archive──▶ Archived
//!    ▲                     │
//!    └──deadline elapsed───┤
//!                          └──dead_letter──▶ DeadLettered
//! ```
//!
//! A message is never both visible and leased: while a lease is current
//! (`deadline > now`) no other consumer can receive it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Work item referencing a durably stored original
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub original_path: String,
    pub classroom_id: Uuid,
    /// Dimensions reported by the uploader; the worker re-reads intrinsic ones.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub alt_text: Option<String>,
}

/// Identifies one specific lease of one message.
///
/// A new lease id is minted on every delivery, so a handle from an expired lease
/// cannot acknowledge a later redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseHandle {
    pub message_id: i64,
    pub lease_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MessageState {
    Visible,
    Leased {
        lease_id: Uuid,
        deadline: DateTime<Utc>,
    },
    Archived {
        at: DateTime<Utc>,
    },
    DeadLettered {
        at: DateTime<Utc>,
        reason: String,
    },
}

impl MessageState {
    /// Whether a consumer may lease the message at `now`.
    ///
    /// A lease whose deadline has passed is indistinguishable from `Visible`.
    pub fn is_leasable(&self, now: DateTime<Utc>) -> bool {
        match self {
            MessageState::Visible => true,
            MessageState::Leased { deadline, .. } => *deadline <= now,
            MessageState::Archived { .. } | MessageState::DeadLettered { .. } => false,
        }
    }

    /// Whether `handle` still holds the current, unexpired lease at `now`.
    pub fn holds_lease(&self, lease_id: Uuid, now: DateTime<Utc>) -> bool {
        matches!(
            self,
            MessageState::Leased { lease_id: current, deadline }
                if *current == lease_id && *deadline > now
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MessageState::Archived { .. } | MessageState::DeadLettered { .. }
        )
    }
}

/// A leased delivery of a queue message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: i64,
    pub payload: JobPayload,
    pub handle: LeaseHandle,
    pub visibility_deadline: DateTime<Utc>,
    /// Number of times the message has been leased, including this delivery.
    pub delivery_count: i32,
    pub enqueued_at: DateTime<Utc>,
}

/// Message counts per state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub visible: u64,
    pub leased: u64,
    pub archived: u64,
    pub dead_lettered: u64,
}
