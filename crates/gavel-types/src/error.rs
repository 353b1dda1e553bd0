//! Error types for the Gavel settlement engine.
//!
//! All errors use the `GV_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Auction / bid errors
//! - 2xx: Order / listing errors
//! - 3xx: Ledger errors
//! - 4xx: Relay errors
//! - 5xx: Wallet errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{AuctionId, BidId, ListingId, OrderId, SellerId};

/// Central error enum for all Gavel operations.
#[derive(Debug, Error)]
pub enum MarketError {
    // =================================================================
    // Auction / Bid Errors (1xx)
    // =================================================================
    /// The requested auction was not found in the store.
    #[error("GV_ERR_100: Auction not found: {0}")]
    AuctionNotFound(AuctionId),

    /// The auction already has a recorded winner decision. The finalizer
    /// must never re-evaluate a decided auction.
    #[error("GV_ERR_101: Auction already decided: {0}")]
    AuctionAlreadyDecided(AuctionId),

    /// The requested bid was not found in the store.
    #[error("GV_ERR_102: Bid not found: {0}")]
    BidNotFound(BidId),

    /// The bid has already been settled (idempotency guard).
    #[error("GV_ERR_103: Bid already settled: {0}")]
    BidAlreadySettled(BidId),

    // =================================================================
    // Order / Listing Errors (2xx)
    // =================================================================
    /// The requested order was not found in the store.
    #[error("GV_ERR_200: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order is already in a terminal state (paid, expired or canceled)
    /// and cannot transition again.
    #[error("GV_ERR_201: Order already terminal: {0}")]
    OrderAlreadyTerminal(OrderId),

    /// An order with this ID already exists.
    #[error("GV_ERR_202: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The requested listing was not found in the store.
    #[error("GV_ERR_203: Listing not found: {0}")]
    ListingNotFound(ListingId),

    /// Not enough listing stock to cover the requested quantity.
    #[error("GV_ERR_204: Insufficient stock for {listing}: need {requested}, have {available}")]
    InsufficientStock {
        listing: ListingId,
        requested: u32,
        available: u32,
    },

    /// The requested seller was not found in the store.
    #[error("GV_ERR_205: Seller not found: {0}")]
    SellerNotFound(SellerId),

    // =================================================================
    // Ledger Errors (3xx)
    // =================================================================
    /// The chain index could not be reached or returned garbage. Always
    /// transient: the settlement loop cools down and retries.
    #[error("GV_ERR_300: Ledger unavailable: {reason}")]
    LedgerUnavailable { reason: String },

    // =================================================================
    // Relay Errors (4xx)
    // =================================================================
    /// The relay sidecar rejected or never received an event.
    #[error("GV_ERR_400: Relay publish failed: {reason}")]
    RelayPublishFailed { reason: String },

    /// An event could not be canonicalized or signed.
    #[error("GV_ERR_401: Invalid event: {reason}")]
    InvalidEvent { reason: String },

    // =================================================================
    // Wallet Errors (5xx)
    // =================================================================
    /// A fresh payout address could not be generated for a seller.
    #[error("GV_ERR_500: Address generation failed: {reason}")]
    AddressGeneration { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("GV_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("GV_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (bad env value, missing required setting).
    #[error("GV_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (snapshot file, network).
    #[error("GV_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, MarketError>;

impl From<std::io::Error> for MarketError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
