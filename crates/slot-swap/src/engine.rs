//! Swap transaction engine -- the only writer of slot ownership and request
//! status.
//!
//! Each operation is one store transaction. Validation runs inside the
//! transaction, against the same state the writes apply to, so two
//! concurrent `accept` calls on one request cannot both pass the `PENDING`
//! check, and two requests sharing a slot cannot both move it.
//!
//! ```text
//! PENDING --accept--> ACCEPTED
//! PENDING --reject--> REJECTED
//! PENDING --cancel--> CANCELLED
//! ```

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::error::{Result, SwapError};
use crate::model::{
    NewSwapRequest, RequestId, Slot, SlotId, SlotStatus, SwapRequest, SwapStatus, UserId,
};
use crate::store::SwapStore;
use crate::validator;

/// Orchestrates proposals and responses against a [`SwapStore`].
#[derive(Debug, Clone)]
pub struct SwapEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: SwapStore> SwapEngine<S> {
    /// Create an engine with the default [`EngineConfig`].
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Offer `my_slot_id` in exchange for `their_slot_id`.
    ///
    /// Creates a `PENDING` request bound to the target slot's current owner.
    /// No slot is touched until the request is accepted.
    #[instrument(
        skip_all,
        fields(requester = %requester, my_slot = %my_slot_id, their_slot = %their_slot_id)
    )]
    pub fn propose(
        &self,
        requester: UserId,
        my_slot_id: SlotId,
        their_slot_id: SlotId,
    ) -> Result<SwapRequest> {
        let created_at = Utc::now();
        let request = self
            .store
            .transaction(|tx| -> Result<SwapRequest> {
                let target_user_id = validator::validate_proposal(
                    &*tx,
                    requester,
                    my_slot_id,
                    their_slot_id,
                    &self.config,
                )?;
                Ok(tx.insert_request(NewSwapRequest {
                    requester_user_id: requester,
                    requester_slot_id: my_slot_id,
                    target_user_id,
                    target_slot_id: their_slot_id,
                    created_at,
                })?)
            })
            .inspect_err(|e| trace_failure("propose", e))?;

        info!(request_id = %request.id, target = %request.target_user_id, "swap proposed");
        Ok(request)
    }

    /// Answer a pending request as its target user.
    ///
    /// Dispatches to [`accept`](Self::accept) or [`reject`](Self::reject) and
    /// returns the request's new status.
    pub fn respond(
        &self,
        request_id: RequestId,
        responder: UserId,
        accept: bool,
    ) -> Result<SwapStatus> {
        let request = if accept {
            self.accept(request_id, responder)?
        } else {
            self.reject(request_id, responder)?
        };
        Ok(request.status)
    }

    /// Accept a pending request, exchanging ownership of both slots.
    ///
    /// In one transaction: both slots swap owners, the request becomes
    /// `ACCEPTED`, and both slots drop back to `BUSY`. If either slot has
    /// changed owner since the proposal the whole thing fails with
    /// `StaleSwap` and the request stays `PENDING`.
    #[instrument(skip_all, fields(request_id = %request_id, responder = %responder))]
    pub fn accept(&self, request_id: RequestId, responder: UserId) -> Result<SwapRequest> {
        let accepted = self
            .store
            .transaction(|tx| -> Result<SwapRequest> {
                let mut request = validator::validate_response(&*tx, request_id, responder)?;
                let (requester_slot, target_slot) =
                    validator::validate_exchange(&*tx, &request)?;

                tx.set_slot_owner(requester_slot.id, target_slot.owner_id)?;
                tx.set_slot_owner(target_slot.id, requester_slot.owner_id)?;
                tx.set_request_status(request.id, SwapStatus::Accepted)?;
                tx.set_slot_status(requester_slot.id, SlotStatus::Busy)?;
                tx.set_slot_status(target_slot.id, SlotStatus::Busy)?;

                request.status = SwapStatus::Accepted;
                Ok(request)
            })
            .inspect_err(|e| trace_failure("accept", e))?;

        info!(
            requester_slot = %accepted.requester_slot_id,
            target_slot = %accepted.target_slot_id,
            "swap accepted, ownership exchanged"
        );
        Ok(accepted)
    }

    /// Reject a pending request. Slots are left untouched.
    #[instrument(skip_all, fields(request_id = %request_id, responder = %responder))]
    pub fn reject(&self, request_id: RequestId, responder: UserId) -> Result<SwapRequest> {
        let rejected = self
            .store
            .transaction(|tx| -> Result<SwapRequest> {
                let mut request = validator::validate_response(&*tx, request_id, responder)?;
                tx.set_request_status(request.id, SwapStatus::Rejected)?;
                request.status = SwapStatus::Rejected;
                Ok(request)
            })
            .inspect_err(|e| trace_failure("reject", e))?;

        info!("swap rejected");
        Ok(rejected)
    }

    /// Withdraw a pending request as its requester. Slots are left untouched.
    #[instrument(skip_all, fields(request_id = %request_id, requester = %requester))]
    pub fn cancel(&self, request_id: RequestId, requester: UserId) -> Result<SwapRequest> {
        let cancelled = self
            .store
            .transaction(|tx| -> Result<SwapRequest> {
                let mut request =
                    validator::validate_cancellation(&*tx, request_id, requester, &self.config)?;
                tx.set_request_status(request.id, SwapStatus::Cancelled)?;
                request.status = SwapStatus::Cancelled;
                Ok(request)
            })
            .inspect_err(|e| trace_failure("cancel", e))?;

        info!("swap cancelled");
        Ok(cancelled)
    }

    /// List or unlist a slot in the marketplace on behalf of its owner.
    ///
    /// # Errors
    /// `SlotNotOwned` if the slot is missing or owned by someone else.
    #[instrument(skip_all, fields(owner = %owner, slot_id = %slot_id, status = %status))]
    pub fn set_slot_status(
        &self,
        owner: UserId,
        slot_id: SlotId,
        status: SlotStatus,
    ) -> Result<Slot> {
        let slot = self
            .store
            .transaction(|tx| -> Result<Slot> {
                let mut slot = tx
                    .slot(slot_id)?
                    .filter(|slot| slot.owner_id == owner)
                    .ok_or(SwapError::SlotNotOwned {
                        slot_id,
                        user_id: owner,
                    })?;
                tx.set_slot_status(slot_id, status)?;
                slot.status = status;
                Ok(slot)
            })
            .inspect_err(|e| trace_failure("set_slot_status", e))?;

        debug!("slot status updated");
        Ok(slot)
    }
}

fn trace_failure(operation: &'static str, error: &SwapError) {
    match error {
        SwapError::Store(e) => {
            warn!(operation, error = %e, "store failure, transaction rolled back")
        }
        SwapError::StaleSwap { .. } => {
            warn!(operation, error = %error, "stale swap refused")
        }
        _ => debug!(operation, error = %error, "operation rejected"),
    }
}
