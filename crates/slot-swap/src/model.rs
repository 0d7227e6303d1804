//! Records shared by the store, the validator, and the engine.
//!
//! Field names serialize as camelCase and statuses as upper-case strings so
//! snapshots and query results keep the shape clients already consume.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

define_id! {
    /// Opaque user identifier supplied by the auth collaborator.
    UserId
}

define_id! {
    /// Calendar slot identifier. Immutable once assigned.
    SlotId
}

define_id! {
    /// Swap request identifier. Immutable once assigned.
    RequestId
}

/// Marketplace visibility of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    /// Not offered for exchange.
    #[default]
    Busy,
    /// Listed in the marketplace by its owner.
    Swappable,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Busy => f.write_str("BUSY"),
            SlotStatus::Swappable => f.write_str("SWAPPABLE"),
        }
    }
}

/// Lifecycle of a swap request.
///
/// `Pending` is the only non-terminal state. Every other status is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    /// Withdrawn by the requester before the target responded.
    Cancelled,
}

impl SwapStatus {
    pub fn is_terminal(self) -> bool {
        self != SwapStatus::Pending
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwapStatus::Pending => "PENDING",
            SwapStatus::Accepted => "ACCEPTED",
            SwapStatus::Rejected => "REJECTED",
            SwapStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Display identity of a user, owned by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// A calendar slot owned by exactly one user.
///
/// `title`, `start_time` and `end_time` belong to the slot CRUD surface; the
/// swap engine only ever touches `owner_id` and `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: SlotId,
    #[serde(rename = "userId")]
    pub owner_id: UserId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SlotStatus,
    pub created_at: DateTime<Utc>,
}

/// Title and time fields of a slot, as edited by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDetails {
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// A proposal to exchange `requester_slot_id` for `target_slot_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub id: RequestId,
    pub requester_user_id: UserId,
    pub requester_slot_id: SlotId,
    pub target_user_id: UserId,
    pub target_slot_id: SlotId,
    pub status: SwapStatus,
    pub created_at: DateTime<Utc>,
}

/// A swap request before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSwapRequest {
    pub requester_user_id: UserId,
    pub requester_slot_id: SlotId,
    pub target_user_id: UserId,
    pub target_slot_id: SlotId,
    pub created_at: DateTime<Utc>,
}
