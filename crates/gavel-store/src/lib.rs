//! # gavel-store
//!
//! The persistent order/auction store: the single source of truth both
//! engine loops read and mutate, and their only coupling point.
//!
//! ## Model
//!
//! - Reads are plain queries returning owned clones; the engine caches
//!   nothing across loop iterations.
//! - Writes are staged on a [`StoreTx`] and committed as one atomic batch
//!   under a single lock acquisition. Dropping an uncommitted transaction
//!   discards its mutations — that is the rollback path.
//! - Every mutation carries a terminal-state guard: a decided auction cannot
//!   be re-decided, a terminal order cannot transition again, a settled bid
//!   cannot settle twice. Guards are what make re-running a pass over an
//!   unchanged store a no-op.
//! - With a snapshot path configured, every committed batch is persisted as
//!   a JSON snapshot (write-to-temp + rename), so a restarted process
//!   resumes from the last committed state.

pub mod store;
pub mod tx;

pub use store::MarketStore;
pub use tx::{Mutation, StoreTx};
