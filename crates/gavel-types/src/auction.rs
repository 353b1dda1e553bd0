//! Auction and bid types.
//!
//! The winner decision is an explicit tagged state, not a nullable flag:
//! `Pending` means the finalizer has not evaluated the auction yet, and is
//! the only state from which a transition is allowed. Once `NoWinner` or
//! `Winner` is recorded the auction is terminal for the finalizer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{AuctionId, BidId, EventId, IdentityKey, Sats, SellerId};

/// Outcome of auction finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinnerDecision {
    /// Not yet evaluated by the finalizer.
    Pending,
    /// Evaluated: no eligible bid, or the reserve price was not reached.
    NoWinner,
    /// Evaluated: this bid won.
    Winner(BidId),
}

impl WinnerDecision {
    /// Whether the finalizer has already recorded an outcome.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn winning_bid(&self) -> Option<BidId> {
        match self {
            Self::Winner(bid) => Some(*bid),
            _ => None,
        }
    }
}

impl std::fmt::Display for WinnerDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::NoWinner => write!(f, "NO_WINNER"),
            Self::Winner(bid) => write!(f, "WINNER({bid})"),
        }
    }
}

/// A time-boxed bidding process for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,
    pub seller_id: SellerId,
    pub title: String,
    /// Minimum winning amount. A top bid below this means no winner.
    pub reserve_price: Sats,
    pub end_at: DateTime<Utc>,
    pub decision: WinnerDecision,
    /// The relay event this auction was announced with; bid-status events
    /// reference it in their tags.
    pub event_id: EventId,
    pub created_at: DateTime<Utc>,
}

impl Auction {
    #[must_use]
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_at <= now
    }

    /// Anti-sniping extension: if the auction is still running and ends
    /// within `window`, the end time moves out to `now + window`.
    ///
    /// Returns the new end time together with the number of seconds added,
    /// or `None` when the policy does not apply.
    #[must_use]
    pub fn extension_after(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Option<(DateTime<Utc>, i64)> {
        if self.has_ended(now) || self.end_at - now >= window {
            return None;
        }
        let new_end = now + window;
        Some((new_end, (new_end - self.end_at).num_seconds()))
    }
}

/// A bid on an auction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub auction_id: AuctionId,
    pub amount: Sats,
    /// Public identity of the bidder, if known. Bids placed through legacy
    /// channels may have none; such a bid can win but opens no order.
    pub bidder: Option<IdentityKey>,
    /// The signed relay event the bid originated from.
    pub event_id: EventId,
    /// Whether this bid is gated on a completed deposit purchase
    /// ("skin in the game") before it becomes eligible.
    pub requires_deposit: bool,
    /// Set when the bid became eligible for top-bid selection. `None` for a
    /// deposit-gated bid whose deposit has not been paid yet.
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Bid {
    /// Only settled bids participate in top-bid selection.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled_at.is_some()
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Auction {
    pub fn dummy(seller_id: SellerId, reserve_price: Sats, end_at: DateTime<Utc>) -> Self {
        Self {
            id: AuctionId::new(),
            seller_id,
            title: "dummy auction".to_string(),
            reserve_price,
            end_at,
            decision: WinnerDecision::Pending,
            event_id: EventId::new("a".repeat(64)),
            created_at: Utc::now(),
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Bid {
    pub fn dummy(auction_id: AuctionId, amount: Sats, bidder: Option<IdentityKey>) -> Self {
        Self {
            id: BidId::new(),
            auction_id,
            amount,
            bidder,
            event_id: EventId::new("b".repeat(64)),
            requires_deposit: false,
            settled_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    /// A deposit-gated bid that has not been unlocked yet.
    pub fn dummy_pending_deposit(
        auction_id: AuctionId,
        amount: Sats,
        bidder: IdentityKey,
    ) -> Self {
        Self {
            id: BidId::new(),
            auction_id,
            amount,
            bidder: Some(bidder),
            event_id: EventId::new("c".repeat(64)),
            requires_deposit: true,
            settled_at: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_states() {
        assert!(!WinnerDecision::Pending.is_decided());
        assert!(WinnerDecision::NoWinner.is_decided());
        let bid = BidId::new();
        assert_eq!(WinnerDecision::Winner(bid).winning_bid(), Some(bid));
        assert_eq!(WinnerDecision::NoWinner.winning_bid(), None);
    }

    #[test]
    fn auction_end_check() {
        let now = Utc::now();
        let auction = Auction::dummy(SellerId::new(), 1000, now - Duration::seconds(1));
        assert!(auction.has_ended(now));
        let auction = Auction::dummy(SellerId::new(), 1000, now + Duration::minutes(10));
        assert!(!auction.has_ended(now));
    }

    #[test]
    fn extension_applies_only_near_end() {
        let now = Utc::now();
        let window = Duration::minutes(5);

        // Ends in 2 minutes: extended to now + 5 minutes.
        let auction = Auction::dummy(SellerId::new(), 0, now + Duration::minutes(2));
        let (new_end, added) = auction.extension_after(now, window).unwrap();
        assert_eq!(new_end, now + window);
        assert_eq!(added, 180);

        // Ends in 10 minutes: no extension.
        let auction = Auction::dummy(SellerId::new(), 0, now + Duration::minutes(10));
        assert!(auction.extension_after(now, window).is_none());

        // Already ended: no extension.
        let auction = Auction::dummy(SellerId::new(), 0, now - Duration::minutes(1));
        assert!(auction.extension_after(now, window).is_none());
    }

    #[test]
    fn pending_deposit_bid_is_not_settled() {
        let bid =
            Bid::dummy_pending_deposit(AuctionId::new(), 500, IdentityKey::from_pubkey([1; 32]));
        assert!(!bid.is_settled());
        assert!(bid.requires_deposit);
    }
}
