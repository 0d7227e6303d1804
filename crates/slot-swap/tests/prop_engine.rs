//! Property-based tests for the swap engine using proptest.
//!
//! Random operation sequences run against a small world; after every step
//! the store must satisfy the engine's invariants regardless of which
//! operations succeeded.

mod common;

use std::collections::BTreeMap;

use common::{engine, store_with, user};
use proptest::prelude::*;
use slot_swap::{
    RequestId, SlotId, SlotStatus, StoreSnapshot, SwapError, SwapStatus, UserId,
};

const USERS: u64 = 3;
const SLOTS_PER_USER: u64 = 2;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    List { user: u64, slot: u64, swappable: bool },
    Propose { user: u64, mine: u64, theirs: u64 },
    Respond { user: u64, request: u64, accept: bool },
    Cancel { user: u64, request: u64 },
}

fn arb_user() -> impl Strategy<Value = u64> {
    1..=USERS
}

fn arb_slot() -> impl Strategy<Value = u64> {
    1..=(USERS * SLOTS_PER_USER)
}

fn arb_request() -> impl Strategy<Value = u64> {
    1u64..=10
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (arb_user(), arb_slot(), any::<bool>()).prop_map(|(user, slot, swappable)| Op::List {
            user,
            slot,
            swappable
        }),
        (arb_user(), arb_slot(), arb_slot())
            .prop_map(|(user, mine, theirs)| Op::Propose { user, mine, theirs }),
        (arb_user(), arb_request(), any::<bool>()).prop_map(|(user, request, accept)| {
            Op::Respond {
                user,
                request,
                accept,
            }
        }),
        (arb_user(), arb_request()).prop_map(|(user, request)| Op::Cancel { user, request }),
    ]
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Users 1..=3, each owning two slots; every slot starts out swappable.
fn small_world() -> common::Store {
    let users = (1..=USERS).map(|id| user(id, &format!("User{}", id))).collect();
    let slots = (1..=USERS * SLOTS_PER_USER)
        .map(|id| {
            let owner = (id - 1) / SLOTS_PER_USER + 1;
            common::slot(id, owner, SlotStatus::Swappable, 2 + id as u32, 9)
        })
        .collect();
    store_with(users, slots)
}

fn owners(snapshot: &StoreSnapshot) -> BTreeMap<SlotId, UserId> {
    snapshot.slots.iter().map(|s| (s.id, s.owner_id)).collect()
}

fn slots_per_user(snapshot: &StoreSnapshot) -> BTreeMap<UserId, usize> {
    let mut counts = BTreeMap::new();
    for slot in &snapshot.slots {
        *counts.entry(slot.owner_id).or_insert(0) += 1;
    }
    counts
}

fn status_of(snapshot: &StoreSnapshot, id: RequestId) -> Option<SwapStatus> {
    snapshot.requests.iter().find(|r| r.id == id).map(|r| r.status)
}

// ---------------------------------------------------------------------------
// Property 1: failed operations leave the store untouched, successful ones
// only make the changes they promise
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn every_step_preserves_invariants(ops in prop::collection::vec(arb_op(), 1..40)) {
        let store = small_world();
        let engine = engine(&store);
        let initial_counts = slots_per_user(&store.snapshot());

        for op in ops {
            let before = store.snapshot();

            let outcome: Result<(), SwapError> = match op {
                Op::List { user, slot, swappable } => {
                    let status = if swappable { SlotStatus::Swappable } else { SlotStatus::Busy };
                    engine.set_slot_status(UserId(user), SlotId(slot), status).map(|_| ())
                }
                Op::Propose { user, mine, theirs } => engine
                    .propose(UserId(user), SlotId(mine), SlotId(theirs))
                    .map(|_| ()),
                Op::Respond { user, request, accept } => {
                    let id = RequestId(request);
                    let prior = status_of(&before, id);
                    let result = engine.respond(id, UserId(user), accept);

                    if let Ok(status) = result {
                        // Only a pending request can be answered.
                        prop_assert_eq!(prior, Some(SwapStatus::Pending));
                        let after = store.snapshot();
                        let req = after.requests.iter().find(|r| r.id == id).unwrap();
                        prop_assert_eq!(req.status, status);

                        let owners_before = owners(&before);
                        let owners_after = owners(&after);
                        if accept {
                            prop_assert_eq!(
                                owners_after[&req.requester_slot_id],
                                owners_before[&req.target_slot_id]
                            );
                            prop_assert_eq!(
                                owners_after[&req.target_slot_id],
                                owners_before[&req.requester_slot_id]
                            );
                            for slot in &after.slots {
                                if slot.id == req.requester_slot_id || slot.id == req.target_slot_id {
                                    prop_assert_eq!(slot.status, SlotStatus::Busy);
                                }
                            }
                        } else {
                            prop_assert_eq!(&before.slots, &after.slots);
                        }
                    }
                    result.map(|_| ())
                }
                Op::Cancel { user, request } => engine
                    .cancel(RequestId(request), UserId(user))
                    .map(|_| ()),
            };

            let after = store.snapshot();
            if outcome.is_err() {
                prop_assert_eq!(&before, &after, "a failed operation must not write");
            }

            // Terminal statuses never change.
            for request in &before.requests {
                if request.status.is_terminal() {
                    prop_assert_eq!(status_of(&after, request.id), Some(request.status));
                }
            }

            // Swaps move slots between users but never create or destroy them.
            prop_assert_eq!(slots_per_user(&after), initial_counts.clone());
            prop_assert_eq!(after.slots.len() as u64, USERS * SLOTS_PER_USER);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 2: a valid proposal always echoes its input
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn proposal_echoes_input(requester in arb_user(), target in arb_user(), a in 0u64..2, b in 0u64..2) {
        prop_assume!(requester != target);
        let store = small_world();
        let mine = (requester - 1) * SLOTS_PER_USER + 1 + a;
        let theirs = (target - 1) * SLOTS_PER_USER + 1 + b;

        let request = engine(&store)
            .propose(UserId(requester), SlotId(mine), SlotId(theirs))
            .unwrap();

        prop_assert_eq!(request.status, SwapStatus::Pending);
        prop_assert_eq!(request.requester_user_id, UserId(requester));
        prop_assert_eq!(request.requester_slot_id, SlotId(mine));
        prop_assert_eq!(request.target_user_id, UserId(target));
        prop_assert_eq!(request.target_slot_id, SlotId(theirs));
    }
}

// ---------------------------------------------------------------------------
// Property 3: accepting twice never swaps twice
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn second_accept_is_already_resolved(requester in arb_user(), target in arb_user()) {
        prop_assume!(requester != target);
        let store = small_world();
        let engine = engine(&store);
        let mine = (requester - 1) * SLOTS_PER_USER + 1;
        let theirs = (target - 1) * SLOTS_PER_USER + 1;

        let request = engine
            .propose(UserId(requester), SlotId(mine), SlotId(theirs))
            .unwrap();
        engine.accept(request.id, UserId(target)).unwrap();
        let settled = store.snapshot();

        let second = engine.accept(request.id, UserId(target));
        prop_assert_eq!(
            second,
            Err(SwapError::AlreadyResolved { request_id: request.id, status: SwapStatus::Accepted })
        );
        prop_assert_eq!(store.snapshot(), settled);
    }
}
