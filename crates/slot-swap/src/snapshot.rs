//! Serializable export of a [`MemoryStore`](crate::MemoryStore).
//!
//! A snapshot is the durable form of the in-memory store: plain JSON with
//! the three relations and the id counters. Loading re-checks referential
//! integrity and the record rules the store enforces on write (unique
//! emails, slots that end after they start), so a hand-edited file cannot
//! smuggle in a row the store would never have produced.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::memory::{check_time_range, Tables};
use crate::model::{Slot, SwapRequest, UserProfile};
use crate::store::StoreResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSnapshot {
    pub users: Vec<UserProfile>,
    pub slots: Vec<Slot>,
    pub requests: Vec<SwapRequest>,
    pub next_user_id: u64,
    pub next_slot_id: u64,
    pub next_request_id: u64,
}

impl StoreSnapshot {
    pub(crate) fn from_tables(tables: &Tables) -> Self {
        Self {
            users: tables.users.values().cloned().collect(),
            slots: tables.slots.values().cloned().collect(),
            requests: tables.requests.values().cloned().collect(),
            next_user_id: tables.next_user_id,
            next_slot_id: tables.next_slot_id,
            next_request_id: tables.next_request_id,
        }
    }

    pub(crate) fn into_tables(self) -> StoreResult<Tables> {
        let mut tables = Tables {
            next_user_id: self.next_user_id,
            next_slot_id: self.next_slot_id,
            next_request_id: self.next_request_id,
            ..Tables::default()
        };

        for user in self.users {
            if tables.users.values().any(|u| u.email == user.email) {
                return Err(StoreError::Constraint(format!(
                    "email {} is registered twice",
                    user.email
                )));
            }
            tables.next_user_id = tables.next_user_id.max(user.id.0);
            if tables.users.insert(user.id, user).is_some() {
                return Err(StoreError::Constraint("duplicate user id".to_string()));
            }
        }

        for slot in self.slots {
            if !tables.users.contains_key(&slot.owner_id) {
                return Err(StoreError::Constraint(format!(
                    "slot {} is owned by unknown user {}",
                    slot.id, slot.owner_id
                )));
            }
            check_time_range(slot.start_time, slot.end_time)?;
            tables.next_slot_id = tables.next_slot_id.max(slot.id.0);
            if tables.slots.insert(slot.id, slot).is_some() {
                return Err(StoreError::Constraint("duplicate slot id".to_string()));
            }
        }

        for request in self.requests {
            for user_id in [request.requester_user_id, request.target_user_id] {
                if !tables.users.contains_key(&user_id) {
                    return Err(StoreError::Constraint(format!(
                        "swap request {} references unknown user {}",
                        request.id, user_id
                    )));
                }
            }
            for slot_id in [request.requester_slot_id, request.target_slot_id] {
                if !tables.slots.contains_key(&slot_id) {
                    return Err(StoreError::Constraint(format!(
                        "swap request {} references missing slot {}",
                        request.id, slot_id
                    )));
                }
            }
            tables.next_request_id = tables.next_request_id.max(request.id.0);
            if tables.requests.insert(request.id, request).is_some() {
                return Err(StoreError::Constraint("duplicate swap request id".to_string()));
            }
        }

        Ok(tables)
    }

    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Load a snapshot file. A missing file yields an empty snapshot.
    pub fn load(path: &Path) -> StoreResult<Self> {
        match fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(StoreError::Io(format!("{}: {}", path.display(), e))),
        }
    }

    /// Write the snapshot to `<path>.tmp` and rename it into place, so a
    /// crash mid-write never leaves a truncated file behind. The temporary
    /// file is removed if any step fails.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let json = self.to_json()?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let written = fs::File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(json.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, path));

        written.map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::Io(format!("{}: {}", path.display(), e))
        })
    }
}
