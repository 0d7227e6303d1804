//! Error types for slot-swap operations.

use thiserror::Error;

use crate::model::{RequestId, SlotId, SwapStatus, UserId};

/// Failures raised by a store adapter.
///
/// These are infrastructure errors: the caller did nothing wrong, and
/// resubmitting the same operation is safe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A write referenced a row that does not exist, or broke a reference.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Reading or writing durable state failed.
    #[error("storage I/O failed: {0}")]
    Io(String),

    /// Durable state could not be encoded or decoded.
    #[error("snapshot serialization failed: {0}")]
    Serialization(String),

    /// The transaction was aborted by the store before commit.
    #[error("transaction aborted: {0}")]
    Aborted(String),
}

/// Coarse classification of a [`SwapError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Expected, user-facing rejection. Nothing was written.
    Validation,
    /// Storage failed. Nothing was written; the operation may be retried.
    Infrastructure,
}

/// Errors returned by the validator and the swap engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    /// The offered slot does not exist or is not owned by the caller.
    #[error("slot {slot_id} is not owned by user {user_id}")]
    SlotNotOwned { slot_id: SlotId, user_id: UserId },

    #[error("target slot {0} not found")]
    TargetSlotNotFound(SlotId),

    #[error("target slot {0} is not available for swapping")]
    TargetNotSwappable(SlotId),

    /// The target slot already belongs to the requester.
    #[error("slot {0} is already owned by the requester")]
    SelfSwap(SlotId),

    #[error("swap request {0} not found")]
    RequestNotFound(RequestId),

    #[error("user {user_id} is not authorized to act on swap request {request_id}")]
    NotAuthorized {
        request_id: RequestId,
        user_id: UserId,
    },

    #[error("swap request {request_id} is already {status}")]
    AlreadyResolved {
        request_id: RequestId,
        status: SwapStatus,
    },

    /// One side of the exchange changed owner (or vanished) after the
    /// request was proposed.
    #[error("swap request {request_id} is stale: slot {slot_id} changed since proposal")]
    StaleSwap {
        request_id: RequestId,
        slot_id: SlotId,
    },

    #[error("cancelling swap requests is disabled")]
    CancellationDisabled,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SwapError {
    /// Classify this error as a validation rejection or an infrastructure failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SwapError::Store(_) => ErrorKind::Infrastructure,
            _ => ErrorKind::Validation,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

/// Convenience alias used throughout slot-swap.
pub type Result<T> = std::result::Result<T, SwapError>;
