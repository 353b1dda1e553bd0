//! # gavel-relay
//!
//! The relay publisher: everything the engine sends to the outside world
//! goes through here as a signed event posted to the relay sidecar.
//!
//! - [`RelayEvent`] — canonical event form: id is the SHA-256 of the
//!   canonical JSON array, signature is ed25519 over the id bytes.
//! - [`seal`] — AES-256-GCM sealing of direct-message bodies under a
//!   per-conversation key.
//! - [`RelayPublisher`] — one required method (`publish_event`) plus
//!   provided helpers that build, sign and publish the domain events the
//!   engine needs: buyer direct messages, bid-status announcements, and
//!   listing re-publishes.
//! - [`HttpRelay`] / [`MockRelay`] — sidecar client and recording mock.
//!
//! Publishing is idempotency-sensitive: every helper returns the event id
//! on success and `None` on failure, and the engine commits the
//! corresponding store transition only after a `Some` (publish-then-commit).

pub mod event;
pub mod http;
pub mod mock;
pub mod publisher;
pub mod seal;

pub use event::RelayEvent;
pub use http::HttpRelay;
pub use mock::MockRelay;
pub use publisher::{BidStatus, BidStatusOpts, RelayPublisher};
