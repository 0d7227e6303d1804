//! Read-only marketplace projections.
//!
//! Each query joins slots and requests with user display data. Rows whose
//! joined user or slot no longer resolves are left out rather than returned
//! half-filled.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    RequestId, Slot, SlotId, SlotStatus, SwapRequest, SwapStatus, UserId, UserProfile,
};
use crate::store::{StoreResult, StoreView, SwapStore};

/// A slot listed by another user, with its owner's display identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwappableSlot {
    pub id: SlotId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SlotStatus,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

/// Title and times of one side of a swap request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSummary {
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<&Slot> for SlotSummary {
    fn from(slot: &Slot) -> Self {
        Self {
            title: slot.title.clone(),
            start_time: slot.start_time,
            end_time: slot.end_time,
        }
    }
}

/// A request addressed to the viewing user.
///
/// `my_slot` is the slot being asked for (the target slot); `their_slot` is
/// the one offered in return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingRequest {
    pub id: RequestId,
    pub requester_user_id: UserId,
    pub requester_slot_id: SlotId,
    pub target_user_id: UserId,
    pub target_slot_id: SlotId,
    pub status: SwapStatus,
    pub created_at: DateTime<Utc>,
    pub requester_name: String,
    pub requester_email: String,
    pub my_slot: SlotSummary,
    pub their_slot: SlotSummary,
}

/// A request made by the viewing user.
///
/// `my_slot` is the slot offered (the requester slot); `their_slot` is the
/// one asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingRequest {
    pub id: RequestId,
    pub requester_user_id: UserId,
    pub requester_slot_id: SlotId,
    pub target_user_id: UserId,
    pub target_slot_id: SlotId,
    pub status: SwapStatus,
    pub created_at: DateTime<Utc>,
    pub target_user_name: String,
    pub target_user_email: String,
    pub my_slot: SlotSummary,
    pub their_slot: SlotSummary,
}

/// Query service over a [`SwapStore`].
#[derive(Debug, Clone)]
pub struct Marketplace<S> {
    store: S,
}

impl<S: SwapStore> Marketplace<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Every `SWAPPABLE` slot not owned by `excluding`, latest start first.
    pub fn list_swappable_slots(&self, excluding: UserId) -> Result<Vec<SwappableSlot>> {
        let mut listed = self.store.read(|view| swappable_slots(view, excluding))??;
        listed.sort_by(|a, b| newest_first(a.start_time, a.id, b.start_time, b.id));
        Ok(listed)
    }

    /// Requests whose target is `user_id`, newest first.
    pub fn list_incoming_requests(&self, user_id: UserId) -> Result<Vec<IncomingRequest>> {
        let mut incoming = self.store.read(|view| incoming_requests(view, user_id))??;
        incoming.sort_by(|a, b| newest_first(a.created_at, a.id, b.created_at, b.id));
        Ok(incoming)
    }

    /// Requests made by `user_id`, newest first.
    pub fn list_outgoing_requests(&self, user_id: UserId) -> Result<Vec<OutgoingRequest>> {
        let mut outgoing = self.store.read(|view| outgoing_requests(view, user_id))??;
        outgoing.sort_by(|a, b| newest_first(a.created_at, a.id, b.created_at, b.id));
        Ok(outgoing)
    }
}

/// Descending by timestamp, ties broken by descending id.
fn newest_first<K: Ord>(a_at: DateTime<Utc>, a_id: K, b_at: DateTime<Utc>, b_id: K) -> Ordering {
    b_at.cmp(&a_at).then(b_id.cmp(&a_id))
}

fn swappable_slots(view: &dyn StoreView, excluding: UserId) -> StoreResult<Vec<SwappableSlot>> {
    let mut listed = Vec::new();
    for slot in view.slots()? {
        if slot.status != SlotStatus::Swappable || slot.owner_id == excluding {
            continue;
        }
        let Some(owner) = view.user(slot.owner_id)? else {
            continue;
        };
        listed.push(SwappableSlot {
            id: slot.id,
            title: slot.title,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status: slot.status,
            user_id: owner.id,
            name: owner.name,
            email: owner.email,
        });
    }
    Ok(listed)
}

/// Resolve the counter-party and both slots of a request, or `None` if any
/// of them is gone.
fn join_request(
    view: &dyn StoreView,
    request: &SwapRequest,
    counterparty: UserId,
) -> StoreResult<Option<(UserProfile, Slot, Slot)>> {
    let Some(user) = view.user(counterparty)? else {
        return Ok(None);
    };
    let Some(requester_slot) = view.slot(request.requester_slot_id)? else {
        return Ok(None);
    };
    let Some(target_slot) = view.slot(request.target_slot_id)? else {
        return Ok(None);
    };
    Ok(Some((user, requester_slot, target_slot)))
}

fn incoming_requests(view: &dyn StoreView, user_id: UserId) -> StoreResult<Vec<IncomingRequest>> {
    let mut incoming = Vec::new();
    for request in view.requests()? {
        if request.target_user_id != user_id {
            continue;
        }
        let Some((requester, requester_slot, target_slot)) =
            join_request(view, &request, request.requester_user_id)?
        else {
            continue;
        };
        incoming.push(IncomingRequest {
            id: request.id,
            requester_user_id: request.requester_user_id,
            requester_slot_id: request.requester_slot_id,
            target_user_id: request.target_user_id,
            target_slot_id: request.target_slot_id,
            status: request.status,
            created_at: request.created_at,
            requester_name: requester.name,
            requester_email: requester.email,
            my_slot: SlotSummary::from(&target_slot),
            their_slot: SlotSummary::from(&requester_slot),
        });
    }
    Ok(incoming)
}

fn outgoing_requests(view: &dyn StoreView, user_id: UserId) -> StoreResult<Vec<OutgoingRequest>> {
    let mut outgoing = Vec::new();
    for request in view.requests()? {
        if request.requester_user_id != user_id {
            continue;
        }
        let Some((target_user, requester_slot, target_slot)) =
            join_request(view, &request, request.target_user_id)?
        else {
            continue;
        };
        outgoing.push(OutgoingRequest {
            id: request.id,
            requester_user_id: request.requester_user_id,
            requester_slot_id: request.requester_slot_id,
            target_user_id: request.target_user_id,
            target_slot_id: request.target_slot_id,
            status: request.status,
            created_at: request.created_at,
            target_user_name: target_user.name,
            target_user_email: target_user.email,
            my_slot: SlotSummary::from(&requester_slot),
            their_slot: SlotSummary::from(&target_slot),
        });
    }
    Ok(outgoing)
}
