//! # gavel-types
//!
//! Shared types, errors, and configuration for the **Gavel** marketplace
//! settlement engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AuctionId`], [`BidId`], [`OrderId`], [`ListingId`],
//!   [`SellerId`], [`IdentityKey`], [`TxId`], [`EventId`]
//! - **Auction model**: [`Auction`], [`Bid`], [`WinnerDecision`]
//! - **Order model**: [`Order`], [`OrderItem`], [`ItemRef`], [`Listing`]
//! - **Seller model**: [`Seller`]
//! - **Direct-message payloads**: [`OrderRequest`], [`OrderStatusUpdate`]
//! - **Configuration**: [`EngineConfig`], [`Cadence`], [`UnderpaymentPolicy`]
//! - **Errors**: [`MarketError`] with `GV_ERR_` prefix codes
//! - **Constants**: event kinds, default intervals and timeouts

pub mod auction;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod messages;
pub mod order;
pub mod seller;

// Re-export all primary types at crate root for ergonomic imports:
//   use gavel_types::{Auction, Bid, Order, WinnerDecision, ...};

pub use auction::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use messages::*;
pub use order::*;
pub use seller::*;

// Constants are accessed via `gavel_types::constants::FOO`
// (not re-exported to avoid name collisions).

/// Monetary amount in satoshis. All prices, bids and transaction values are
/// integer sats; there is no sub-satoshi precision anywhere in the system.
pub type Sats = u64;
