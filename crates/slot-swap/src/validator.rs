//! Swap validation -- pure decisions over the current store state.
//!
//! Every function here only reads. The engine calls them from inside its
//! transactions so a decision and the writes it licenses see the same state.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! | operation    | order                                                        |
//! |--------------|--------------------------------------------------------------|
//! | proposal     | `SlotNotOwned`, `TargetSlotNotFound`, `TargetNotSwappable`, `SelfSwap` |
//! | response     | `RequestNotFound`, `NotAuthorized`, `AlreadyResolved`        |
//! | cancellation | `CancellationDisabled`, `RequestNotFound`, `NotAuthorized`, `AlreadyResolved` |
//! | exchange     | `StaleSwap` (requester side first)                           |

use crate::config::EngineConfig;
use crate::error::{Result, SwapError};
use crate::model::{RequestId, Slot, SlotId, SlotStatus, SwapRequest, SwapStatus, UserId};
use crate::store::StoreView;

/// Decide whether `requester` may offer `my_slot_id` in exchange for
/// `their_slot_id`.
///
/// On success returns the current owner of `their_slot_id`, which the engine
/// records as the request's target user.
///
/// # Errors
/// - `SlotNotOwned` if `my_slot_id` is missing or owned by someone else.
/// - `TargetSlotNotFound` if `their_slot_id` is missing.
/// - `TargetNotSwappable` if the target slot is not `SWAPPABLE`.
/// - `SelfSwap` if the requester already owns the target slot and the config
///   does not allow it.
pub fn validate_proposal<V: StoreView + ?Sized>(
    view: &V,
    requester: UserId,
    my_slot_id: SlotId,
    their_slot_id: SlotId,
    config: &EngineConfig,
) -> Result<UserId> {
    let owns_offer = view
        .slot(my_slot_id)?
        .is_some_and(|slot| slot.owner_id == requester);
    if !owns_offer {
        return Err(SwapError::SlotNotOwned {
            slot_id: my_slot_id,
            user_id: requester,
        });
    }

    let target = view
        .slot(their_slot_id)?
        .ok_or(SwapError::TargetSlotNotFound(their_slot_id))?;

    if target.status != SlotStatus::Swappable {
        return Err(SwapError::TargetNotSwappable(their_slot_id));
    }

    if target.owner_id == requester && !config.allow_self_swap {
        return Err(SwapError::SelfSwap(their_slot_id));
    }

    Ok(target.owner_id)
}

/// Decide whether `responder` may accept or reject request `request_id`.
///
/// Returns the request as currently stored.
pub fn validate_response<V: StoreView + ?Sized>(
    view: &V,
    request_id: RequestId,
    responder: UserId,
) -> Result<SwapRequest> {
    let request = view
        .request(request_id)?
        .ok_or(SwapError::RequestNotFound(request_id))?;

    if request.target_user_id != responder {
        return Err(SwapError::NotAuthorized {
            request_id,
            user_id: responder,
        });
    }

    ensure_pending(&request)?;
    Ok(request)
}

/// Decide whether `requester` may withdraw request `request_id`.
pub fn validate_cancellation<V: StoreView + ?Sized>(
    view: &V,
    request_id: RequestId,
    requester: UserId,
    config: &EngineConfig,
) -> Result<SwapRequest> {
    if !config.allow_cancellation {
        return Err(SwapError::CancellationDisabled);
    }

    let request = view
        .request(request_id)?
        .ok_or(SwapError::RequestNotFound(request_id))?;

    if request.requester_user_id != requester {
        return Err(SwapError::NotAuthorized {
            request_id,
            user_id: requester,
        });
    }

    ensure_pending(&request)?;
    Ok(request)
}

/// Re-check, at accept time, that both slots still exist and still belong
/// to the parties recorded on the request.
///
/// Returns `(requester_slot, target_slot)` as currently stored.
///
/// # Errors
/// `StaleSwap` naming the first slot that no longer matches.
pub fn validate_exchange<V: StoreView + ?Sized>(
    view: &V,
    request: &SwapRequest,
) -> Result<(Slot, Slot)> {
    let requester_slot = expect_owned(
        view,
        request.id,
        request.requester_slot_id,
        request.requester_user_id,
    )?;
    let target_slot = expect_owned(
        view,
        request.id,
        request.target_slot_id,
        request.target_user_id,
    )?;
    Ok((requester_slot, target_slot))
}

fn expect_owned<V: StoreView + ?Sized>(
    view: &V,
    request_id: RequestId,
    slot_id: SlotId,
    owner: UserId,
) -> Result<Slot> {
    match view.slot(slot_id)? {
        Some(slot) if slot.owner_id == owner => Ok(slot),
        _ => Err(SwapError::StaleSwap {
            request_id,
            slot_id,
        }),
    }
}

fn ensure_pending(request: &SwapRequest) -> Result<()> {
    if request.status != SwapStatus::Pending {
        return Err(SwapError::AlreadyResolved {
            request_id: request.id,
            status: request.status,
        });
    }
    Ok(())
}
