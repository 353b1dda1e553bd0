//! # gavel-engine
//!
//! The two reconciliation loops at the heart of the marketplace:
//!
//! - [`AuctionFinalizer`] — decides the winner of every ended auction
//!   exactly once and opens the winner's payment order.
//! - [`PaymentSettler`] — reconciles open orders against the external chain
//!   index, advancing each to paid or expired, restoring stock on expiry and
//!   unlocking deposit-gated bids.
//!
//! Both loops poll the store, call out to the injected ledger / relay /
//! wallet clients, and commit each state transition through
//! [`saga::publish_then_commit`]: the externally observable notification is
//! sent first, and the store transition commits only after the send
//! succeeded. A failed send leaves the entity's persisted state untouched,
//! so the next pass re-evaluates it from scratch — at-least-once
//! notification, at-most-once durable transition per attempt, safe across
//! crashes.

pub mod finalizer;
pub mod saga;
pub mod settler;

pub use finalizer::AuctionFinalizer;
pub use settler::PaymentSettler;
