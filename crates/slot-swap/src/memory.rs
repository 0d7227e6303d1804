//! In-memory [`SwapStore`] with staged, all-or-nothing transactions.
//!
//! Tables live behind a `parking_lot::RwLock`. Reads share the lock;
//! transactions hold it exclusively for their whole duration, which makes
//! them serializable. Writes are staged in an overlay and only applied to
//! the tables once the transaction body returns `Ok`.
//!
//! The inherent methods (`register_user`, `create_slot`, ...) are the
//! record-access surface used by the auth and slot CRUD collaborators. None
//! of them can change a slot's owner or status, or a request's status.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::model::{
    NewSwapRequest, RequestId, Slot, SlotDetails, SlotId, SlotStatus, SwapRequest, SwapStatus,
    UserId, UserProfile,
};
use crate::snapshot::StoreSnapshot;
use crate::store::{StoreResult, StoreTx, StoreView, SwapStore};

#[derive(Debug, Default, Clone)]
pub(crate) struct Tables {
    pub(crate) users: BTreeMap<UserId, UserProfile>,
    pub(crate) slots: BTreeMap<SlotId, Slot>,
    pub(crate) requests: BTreeMap<RequestId, SwapRequest>,
    pub(crate) next_user_id: u64,
    pub(crate) next_slot_id: u64,
    pub(crate) next_request_id: u64,
}

impl StoreView for Tables {
    fn user(&self, id: UserId) -> StoreResult<Option<UserProfile>> {
        Ok(self.users.get(&id).cloned())
    }

    fn slot(&self, id: SlotId) -> StoreResult<Option<Slot>> {
        Ok(self.slots.get(&id).cloned())
    }

    fn request(&self, id: RequestId) -> StoreResult<Option<SwapRequest>> {
        Ok(self.requests.get(&id).cloned())
    }

    fn slots(&self) -> StoreResult<Vec<Slot>> {
        Ok(self.slots.values().cloned().collect())
    }

    fn requests(&self) -> StoreResult<Vec<SwapRequest>> {
        Ok(self.requests.values().cloned().collect())
    }
}

/// Writes staged by a transaction that has not committed yet.
#[derive(Debug, Default)]
struct Overlay {
    slots: BTreeMap<SlotId, Slot>,
    requests: BTreeMap<RequestId, SwapRequest>,
    next_request_id: u64,
}

struct StagedTx<'a> {
    base: &'a Tables,
    overlay: Overlay,
}

impl<'a> StagedTx<'a> {
    fn new(base: &'a Tables) -> Self {
        Self {
            base,
            overlay: Overlay {
                next_request_id: base.next_request_id,
                ..Overlay::default()
            },
        }
    }

    fn slot_for_write(&mut self, id: SlotId) -> StoreResult<&mut Slot> {
        if !self.overlay.slots.contains_key(&id) {
            let slot = self
                .base
                .slots
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::Constraint(format!("slot {} does not exist", id)))?;
            self.overlay.slots.insert(id, slot);
        }
        self.overlay
            .slots
            .get_mut(&id)
            .ok_or_else(|| StoreError::Aborted(format!("staged slot {} vanished", id)))
    }
}

impl StoreView for StagedTx<'_> {
    fn user(&self, id: UserId) -> StoreResult<Option<UserProfile>> {
        self.base.user(id)
    }

    fn slot(&self, id: SlotId) -> StoreResult<Option<Slot>> {
        match self.overlay.slots.get(&id) {
            Some(slot) => Ok(Some(slot.clone())),
            None => self.base.slot(id),
        }
    }

    fn request(&self, id: RequestId) -> StoreResult<Option<SwapRequest>> {
        match self.overlay.requests.get(&id) {
            Some(request) => Ok(Some(request.clone())),
            None => self.base.request(id),
        }
    }

    fn slots(&self) -> StoreResult<Vec<Slot>> {
        let mut merged = self.base.slots.clone();
        merged.extend(self.overlay.slots.clone());
        Ok(merged.into_values().collect())
    }

    fn requests(&self) -> StoreResult<Vec<SwapRequest>> {
        let mut merged = self.base.requests.clone();
        merged.extend(self.overlay.requests.clone());
        Ok(merged.into_values().collect())
    }
}

impl StoreTx for StagedTx<'_> {
    fn insert_request(&mut self, new: NewSwapRequest) -> StoreResult<SwapRequest> {
        for slot_id in [new.requester_slot_id, new.target_slot_id] {
            if self.slot(slot_id)?.is_none() {
                return Err(StoreError::Constraint(format!(
                    "swap request references missing slot {}",
                    slot_id
                )));
            }
        }

        self.overlay.next_request_id += 1;
        let request = SwapRequest {
            id: RequestId(self.overlay.next_request_id),
            requester_user_id: new.requester_user_id,
            requester_slot_id: new.requester_slot_id,
            target_user_id: new.target_user_id,
            target_slot_id: new.target_slot_id,
            status: SwapStatus::Pending,
            created_at: new.created_at,
        };
        self.overlay.requests.insert(request.id, request.clone());
        Ok(request)
    }

    fn set_slot_owner(&mut self, id: SlotId, owner: UserId) -> StoreResult<()> {
        self.slot_for_write(id)?.owner_id = owner;
        Ok(())
    }

    fn set_slot_status(&mut self, id: SlotId, status: SlotStatus) -> StoreResult<()> {
        self.slot_for_write(id)?.status = status;
        Ok(())
    }

    fn set_request_status(&mut self, id: RequestId, status: SwapStatus) -> StoreResult<()> {
        if !self.overlay.requests.contains_key(&id) {
            let request =
                self.base.requests.get(&id).cloned().ok_or_else(|| {
                    StoreError::Constraint(format!("swap request {} does not exist", id))
                })?;
            self.overlay.requests.insert(id, request);
        }
        if let Some(request) = self.overlay.requests.get_mut(&id) {
            request.status = status;
        }
        Ok(())
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a previously exported snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> StoreResult<Self> {
        Ok(Self {
            tables: RwLock::new(snapshot.into_tables()?),
        })
    }

    /// Export the current contents as a consistent snapshot.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot::from_tables(&self.tables.read())
    }

    /// Register a user. Emails are unique.
    pub fn register_user(&self, name: &str, email: &str) -> StoreResult<UserProfile> {
        let mut tables = self.tables.write();
        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::Constraint(format!(
                "email {} is already registered",
                email
            )));
        }
        tables.next_user_id += 1;
        let user = UserProfile {
            id: UserId(tables.next_user_id),
            name: name.to_string(),
            email: email.to_string(),
        };
        tables.users.insert(user.id, user.clone());
        debug!(user_id = %user.id, "registered user");
        Ok(user)
    }

    /// Create a slot for `owner`. New slots start out `BUSY`.
    pub fn create_slot(&self, owner: UserId, details: SlotDetails) -> StoreResult<Slot> {
        check_time_range(details.start_time, details.end_time)?;
        let mut tables = self.tables.write();
        if !tables.users.contains_key(&owner) {
            return Err(StoreError::Constraint(format!(
                "slot owner {} does not exist",
                owner
            )));
        }
        tables.next_slot_id += 1;
        let slot = Slot {
            id: SlotId(tables.next_slot_id),
            owner_id: owner,
            title: details.title,
            start_time: details.start_time,
            end_time: details.end_time,
            status: SlotStatus::Busy,
            created_at: Utc::now(),
        };
        tables.slots.insert(slot.id, slot.clone());
        debug!(slot_id = %slot.id, owner_id = %owner, "created slot");
        Ok(slot)
    }

    /// Replace the title and times of a slot owned by `owner`.
    ///
    /// Returns `None` if the slot does not exist or belongs to someone else.
    pub fn update_slot_details(
        &self,
        owner: UserId,
        slot_id: SlotId,
        details: SlotDetails,
    ) -> StoreResult<Option<Slot>> {
        check_time_range(details.start_time, details.end_time)?;
        let mut tables = self.tables.write();
        let Some(slot) = tables
            .slots
            .get_mut(&slot_id)
            .filter(|s| s.owner_id == owner)
        else {
            return Ok(None);
        };
        slot.title = details.title;
        slot.start_time = details.start_time;
        slot.end_time = details.end_time;
        Ok(Some(slot.clone()))
    }

    /// Delete a slot owned by `owner`, cascading to every swap request that
    /// references it. Returns whether a slot was removed.
    pub fn delete_slot(&self, owner: UserId, slot_id: SlotId) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let owned = tables
            .slots
            .get(&slot_id)
            .is_some_and(|s| s.owner_id == owner);
        if !owned {
            return Ok(false);
        }
        tables.slots.remove(&slot_id);
        let before = tables.requests.len();
        tables
            .requests
            .retain(|_, r| r.requester_slot_id != slot_id && r.target_slot_id != slot_id);
        debug!(
            slot_id = %slot_id,
            cascaded = before - tables.requests.len(),
            "deleted slot"
        );
        Ok(true)
    }

    /// Delete a user together with their slots and every swap request that
    /// references the user or one of those slots.
    pub fn delete_user(&self, user_id: UserId) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        if tables.users.remove(&user_id).is_none() {
            return Ok(false);
        }
        tables.slots.retain(|_, s| s.owner_id != user_id);
        let Tables { slots, requests, .. } = &mut *tables;
        requests.retain(|_, r| {
            r.requester_user_id != user_id
                && r.target_user_id != user_id
                && slots.contains_key(&r.requester_slot_id)
                && slots.contains_key(&r.target_slot_id)
        });
        debug!(user_id = %user_id, "deleted user");
        Ok(true)
    }

    /// Slots owned by `owner`, latest start time first.
    pub fn list_user_slots(&self, owner: UserId) -> StoreResult<Vec<Slot>> {
        let tables = self.tables.read();
        let mut slots: Vec<Slot> = tables
            .slots
            .values()
            .filter(|s| s.owner_id == owner)
            .cloned()
            .collect();
        slots.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        Ok(slots)
    }
}

pub(crate) fn check_time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<()> {
    if end <= start {
        return Err(StoreError::Constraint(format!(
            "slot must end after it starts ({} >= {})",
            start, end
        )));
    }
    Ok(())
}

impl SwapStore for MemoryStore {
    fn read<T>(&self, f: impl FnOnce(&dyn StoreView) -> T) -> StoreResult<T> {
        let tables = self.tables.read();
        Ok(f(&*tables))
    }

    fn transaction<T, E>(
        &self,
        f: impl FnOnce(&mut dyn StoreTx) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut tables = self.tables.write();
        let (value, overlay) = {
            let mut tx = StagedTx::new(&tables);
            let value = f(&mut tx)?;
            (value, tx.overlay)
        };

        tables.slots.extend(overlay.slots);
        tables.requests.extend(overlay.requests);
        tables.next_request_id = overlay.next_request_id;
        Ok(value)
    }
}
