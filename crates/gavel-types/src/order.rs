//! Order, order item and listing types.
//!
//! An order is terminal once exactly one of `paid_at`, `expired_at` or
//! `canceled_at` is set; the store guards that no second terminal field is
//! ever written. Orders are mutated exclusively by the settlement loop after
//! creation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{AuctionId, EventId, IdentityKey, ListingId, OrderId, Sats, SellerId};

/// What an order item points at: a fixed-price listing or an auctioned item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemRef {
    Listing(ListingId),
    Auction(AuctionId),
}

impl ItemRef {
    #[must_use]
    pub fn listing_id(&self) -> Option<ListingId> {
        match self {
            Self::Listing(id) => Some(*id),
            Self::Auction(_) => None,
        }
    }

    #[must_use]
    pub fn auction_id(&self) -> Option<AuctionId> {
        match self {
            Self::Auction(id) => Some(*id),
            Self::Listing(_) => None,
        }
    }
}

/// A payment order awaiting on-chain settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub seller_id: SellerId,
    pub buyer: IdentityKey,
    /// Event id of the order-creation direct message sent to the buyer;
    /// correlates later status messages with the original request.
    pub message_event_id: EventId,
    pub requested_at: DateTime<Utc>,
    /// Minutes after `requested_at` at which an unfunded order expires.
    pub timeout_minutes: i64,
    pub total: Sats,
    /// Payout address watched by the settlement loop. `None` when the seller
    /// has no wallet configured; such orders are never scanned.
    pub on_chain_address: Option<String>,
    pub lightning_address: Option<String>,
    /// The funding transaction currently matched to this order, if any.
    pub txid: Option<crate::TxId>,
    pub tx_value: Option<Sats>,
    pub tx_confirmed: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Order {
    #[must_use]
    pub fn new(
        seller_id: SellerId,
        buyer: IdentityKey,
        message_event_id: EventId,
        total: Sats,
        timeout_minutes: i64,
        on_chain_address: Option<String>,
        lightning_address: Option<String>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            seller_id,
            buyer,
            message_event_id,
            requested_at: Utc::now(),
            timeout_minutes,
            total,
            on_chain_address,
            lightning_address,
            txid: None,
            tx_value: None,
            tx_confirmed: false,
            paid_at: None,
            expired_at: None,
            canceled_at: None,
        }
    }

    /// Replace the generated id. The finalizer mints the order id before the
    /// order-creation message is sent, so the buyer-visible id and the stored
    /// id are the same token.
    #[must_use]
    pub fn with_id(mut self, id: OrderId) -> Self {
        self.id = id;
        self
    }

    /// Whether a terminal field has been set. Terminal orders are excluded
    /// from every settlement scan.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.paid_at.is_some() || self.expired_at.is_some() || self.canceled_at.is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.requested_at + Duration::minutes(self.timeout_minutes)
    }

    #[must_use]
    pub fn is_past_timeout(&self, now: DateTime<Utc>) -> bool {
        self.deadline() < now
    }

    /// A funding transaction has been matched but not confirmed yet.
    #[must_use]
    pub fn is_tracking_unconfirmed(&self) -> bool {
        self.txid.is_some() && !self.tx_confirmed
    }
}

/// Links an order to the item(s) it pays for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub source: ItemRef,
    pub quantity: u32,
}

/// A fixed-price item with available stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub seller_id: SellerId,
    pub title: String,
    pub price: Sats,
    pub available_quantity: u32,
    /// A paid purchase of this listing satisfies the bid-deposit
    /// precondition ("skin in the game") for the buyer's pending bids.
    pub deposit_product: bool,
    /// Relay event the listing was published with (the `d` tag of its
    /// replaceable product event).
    pub event_id: EventId,
    pub created_at: DateTime<Utc>,
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy(seller_id: SellerId, buyer: IdentityKey, total: Sats) -> Self {
        Self::new(
            seller_id,
            buyer,
            EventId::new("d".repeat(64)),
            total,
            crate::constants::DEFAULT_ORDER_TIMEOUT_MINUTES,
            Some("tb1qdummyaddress".to_string()),
            None,
        )
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Listing {
    pub fn dummy(seller_id: SellerId, price: Sats, available_quantity: u32) -> Self {
        Self {
            id: ListingId::new(),
            seller_id,
            title: "dummy listing".to_string(),
            price,
            available_quantity,
            deposit_product: false,
            event_id: EventId::new("e".repeat(64)),
            created_at: Utc::now(),
        }
    }
}
