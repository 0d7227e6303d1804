//! Shared fixtures for slot-swap integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use slot_swap::{
    EngineConfig, Marketplace, MemoryStore, NewSwapRequest, RequestId, Slot, SlotId, SlotStatus,
    StoreError, StoreSnapshot, StoreTx, StoreView, SwapEngine, SwapRequest, SwapStatus,
    SwapStore, UserId, UserProfile,
};

pub type Store = Arc<MemoryStore>;

/// Helper to build a UTC timestamp on a day in March 2026.
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

pub fn user(id: u64, name: &str) -> UserProfile {
    UserProfile {
        id: UserId(id),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}

/// Helper to create a one-hour slot starting at `day`/`hour`.
pub fn slot(id: u64, owner: u64, status: SlotStatus, day: u32, hour: u32) -> Slot {
    Slot {
        id: SlotId(id),
        owner_id: UserId(owner),
        title: format!("Slot {}", id),
        start_time: at(day, hour),
        end_time: at(day, hour) + Duration::hours(1),
        status,
        created_at: at(1, 0),
    }
}

pub fn store_with(users: Vec<UserProfile>, slots: Vec<Slot>) -> Store {
    let snapshot = StoreSnapshot {
        users,
        slots,
        ..StoreSnapshot::default()
    };
    Arc::new(MemoryStore::from_snapshot(snapshot).unwrap())
}

/// The canonical world:
///
/// - user 1 (Alice) owns slot 10 (SWAPPABLE) and slot 11 (BUSY)
/// - user 2 (Bob) owns slot 20 (SWAPPABLE)
/// - user 3 (Carol) owns slot 30 (BUSY) and slot 31 (SWAPPABLE)
pub fn world() -> Store {
    store_with(
        vec![user(1, "Alice"), user(2, "Bob"), user(3, "Carol")],
        vec![
            slot(10, 1, SlotStatus::Swappable, 2, 9),
            slot(11, 1, SlotStatus::Busy, 3, 9),
            slot(20, 2, SlotStatus::Swappable, 4, 14),
            slot(30, 3, SlotStatus::Busy, 5, 10),
            slot(31, 3, SlotStatus::Swappable, 6, 16),
        ],
    )
}

pub fn engine(store: &Store) -> SwapEngine<Store> {
    SwapEngine::new(Arc::clone(store))
}

pub fn engine_with(store: &Store, config: EngineConfig) -> SwapEngine<Store> {
    SwapEngine::with_config(Arc::clone(store), config)
}

pub fn marketplace(store: &Store) -> Marketplace<Store> {
    Marketplace::new(Arc::clone(store))
}

pub fn slot_of(store: &Store, id: u64) -> Slot {
    store
        .read(|view| view.slot(SlotId(id)))
        .unwrap()
        .unwrap()
        .expect("slot must exist")
}

pub fn request_of(store: &Store, id: RequestId) -> SwapRequest {
    store
        .read(|view| view.request(id))
        .unwrap()
        .unwrap()
        .expect("swap request must exist")
}

pub fn request_count(store: &Store) -> usize {
    store.read(|view| view.requests()).unwrap().unwrap().len()
}

/// A store wrapper whose transactions fail on the `fail_at`-th write
/// (1-based), for exercising rollback.
pub struct FailingStore {
    pub inner: Store,
    pub fail_at: usize,
}

impl SwapStore for FailingStore {
    fn read<T>(&self, f: impl FnOnce(&dyn StoreView) -> T) -> Result<T, StoreError> {
        self.inner.read(f)
    }

    fn transaction<T, E>(
        &self,
        f: impl FnOnce(&mut dyn StoreTx) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        self.inner.transaction(|tx| {
            let mut failing = FailingTx {
                inner: tx,
                writes: 0,
                fail_at: self.fail_at,
            };
            f(&mut failing)
        })
    }
}

struct FailingTx<'a> {
    inner: &'a mut dyn StoreTx,
    writes: usize,
    fail_at: usize,
}

impl FailingTx<'_> {
    fn tick(&mut self) -> Result<(), StoreError> {
        self.writes += 1;
        if self.writes == self.fail_at {
            return Err(StoreError::Aborted(format!(
                "injected failure at write {}",
                self.writes
            )));
        }
        Ok(())
    }
}

impl StoreView for FailingTx<'_> {
    fn user(&self, id: UserId) -> Result<Option<UserProfile>, StoreError> {
        self.inner.user(id)
    }

    fn slot(&self, id: SlotId) -> Result<Option<Slot>, StoreError> {
        self.inner.slot(id)
    }

    fn request(&self, id: RequestId) -> Result<Option<SwapRequest>, StoreError> {
        self.inner.request(id)
    }

    fn slots(&self) -> Result<Vec<Slot>, StoreError> {
        self.inner.slots()
    }

    fn requests(&self) -> Result<Vec<SwapRequest>, StoreError> {
        self.inner.requests()
    }
}

impl StoreTx for FailingTx<'_> {
    fn insert_request(&mut self, new: NewSwapRequest) -> Result<SwapRequest, StoreError> {
        self.tick()?;
        self.inner.insert_request(new)
    }

    fn set_slot_owner(&mut self, id: SlotId, owner: UserId) -> Result<(), StoreError> {
        self.tick()?;
        self.inner.set_slot_owner(id, owner)
    }

    fn set_slot_status(&mut self, id: SlotId, status: SlotStatus) -> Result<(), StoreError> {
        self.tick()?;
        self.inner.set_slot_status(id, status)
    }

    fn set_request_status(&mut self, id: RequestId, status: SwapStatus) -> Result<(), StoreError> {
        self.tick()?;
        self.inner.set_request_status(id, status)
    }
}
