//! # slot-swap
//!
//! Transactional exchange of calendar slot ownership between users.
//!
//! Users mark slots as swappable, propose trades against other users'
//! swappable slots, and the target user accepts or rejects. Acceptance swaps
//! both owners, closes the request, and returns both slots to `BUSY` in a
//! single store transaction, so a trade either happens completely or not at
//! all.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use chrono::{Duration, TimeZone, Utc};
//! use slot_swap::{MemoryStore, SlotDetails, SlotStatus, SwapEngine, SwapStatus};
//!
//! let store = Arc::new(MemoryStore::new());
//! let alice = store.register_user("Alice", "alice@example.com").unwrap();
//! let bob = store.register_user("Bob", "bob@example.com").unwrap();
//!
//! let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
//! let details = |title: &str| SlotDetails {
//!     title: title.to_string(),
//!     start_time: start,
//!     end_time: start + Duration::hours(1),
//! };
//! let standup = store.create_slot(alice.id, details("Standup")).unwrap();
//! let review = store.create_slot(bob.id, details("Review")).unwrap();
//!
//! let engine = SwapEngine::new(Arc::clone(&store));
//! engine.set_slot_status(alice.id, standup.id, SlotStatus::Swappable).unwrap();
//!
//! let request = engine.propose(bob.id, review.id, standup.id).unwrap();
//! assert_eq!(engine.respond(request.id, alice.id, true).unwrap(), SwapStatus::Accepted);
//! ```
//!
//! ## Modules
//!
//! - [`model`] — slot, swap request and user records
//! - [`store`] — read/write ports and the transactional [`SwapStore`] trait
//! - [`memory`] — in-memory [`SwapStore`] plus the slot/user record surface
//! - [`snapshot`] — JSON export/import of a [`MemoryStore`]
//! - [`validator`] — pure accept/reject decisions
//! - [`engine`] — propose, accept, reject, cancel
//! - [`marketplace`] — read-only joined projections
//! - [`config`] — engine policy switches
//! - [`error`] — error types

pub mod config;
pub mod engine;
pub mod error;
pub mod marketplace;
pub mod memory;
pub mod model;
pub mod snapshot;
pub mod store;
pub mod validator;

pub use config::{ConfigError, EngineConfig};
pub use engine::SwapEngine;
pub use error::{ErrorKind, StoreError, SwapError};
pub use marketplace::{IncomingRequest, Marketplace, OutgoingRequest, SlotSummary, SwappableSlot};
pub use memory::MemoryStore;
pub use model::{
    NewSwapRequest, RequestId, Slot, SlotDetails, SlotId, SlotStatus, SwapRequest, SwapStatus,
    UserId, UserProfile,
};
pub use snapshot::StoreSnapshot;
pub use store::{StoreTx, StoreView, SwapStore};
