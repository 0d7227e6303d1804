//! Store ports for slots, swap requests, and user display data.
//!
//! The engine never touches storage directly. It reads through a
//! [`StoreView`] and writes through a [`StoreTx`], and a [`StoreTx`] only
//! exists inside [`SwapStore::transaction`]. That keeps ownership and
//! request-status writes inside a single atomic unit: either every staged
//! write commits or none does.

use crate::error::StoreError;
use crate::model::{
    NewSwapRequest, RequestId, Slot, SlotId, SlotStatus, SwapRequest, SwapStatus, UserId,
    UserProfile,
};

/// Result alias for store adapters.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read access to the slot, swap request and user relations.
///
/// Inside a transaction, reads observe the transaction's own staged writes.
pub trait StoreView {
    fn user(&self, id: UserId) -> StoreResult<Option<UserProfile>>;

    fn slot(&self, id: SlotId) -> StoreResult<Option<Slot>>;

    fn request(&self, id: RequestId) -> StoreResult<Option<SwapRequest>>;

    /// Every slot, in id order.
    fn slots(&self) -> StoreResult<Vec<Slot>>;

    /// Every swap request, in id order.
    fn requests(&self) -> StoreResult<Vec<SwapRequest>>;
}

/// Write access, only reachable inside [`SwapStore::transaction`].
///
/// Each setter fails with [`StoreError::Constraint`] when the row it names
/// does not exist.
pub trait StoreTx: StoreView {
    /// Insert a new swap request in `PENDING` status and return it with its
    /// assigned id. Both slot references must resolve.
    fn insert_request(&mut self, new: NewSwapRequest) -> StoreResult<SwapRequest>;

    fn set_slot_owner(&mut self, id: SlotId, owner: UserId) -> StoreResult<()>;

    fn set_slot_status(&mut self, id: SlotId, status: SlotStatus) -> StoreResult<()>;

    fn set_request_status(&mut self, id: RequestId, status: SwapStatus) -> StoreResult<()>;
}

/// A transactional backing store for the swap engine.
///
/// Implementations must make transactions serializable: two transactions
/// touching the same rows behave as if one ran entirely before the other.
pub trait SwapStore: Send + Sync {
    /// Run `f` against a consistent read-only view.
    fn read<T>(&self, f: impl FnOnce(&dyn StoreView) -> T) -> StoreResult<T>;

    /// Run `f` against a staged transaction.
    ///
    /// Staged writes commit iff `f` returns `Ok`. An `Err` from `f`, or a
    /// failure while committing, discards every staged write.
    fn transaction<T, E>(
        &self,
        f: impl FnOnce(&mut dyn StoreTx) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<StoreError>;
}

impl<S: SwapStore> SwapStore for std::sync::Arc<S> {
    fn read<T>(&self, f: impl FnOnce(&dyn StoreView) -> T) -> StoreResult<T> {
        (**self).read(f)
    }

    fn transaction<T, E>(
        &self,
        f: impl FnOnce(&mut dyn StoreTx) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<StoreError>,
    {
        (**self).transaction(f)
    }
}
