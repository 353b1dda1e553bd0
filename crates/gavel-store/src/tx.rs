//! Staged transactions: typed mutations, guards, atomic batch commit.

use chrono::{DateTime, Utc};

use gavel_types::{
    AuctionId, BidId, ListingId, MarketError, Order, OrderId, OrderItem, Result, Sats, TxId,
    WinnerDecision,
};
use tracing::debug;

use crate::store::{MarketStore, Tables};

/// One staged state transition. Each variant corresponds to exactly one of
/// the lifecycle arrows: auctions move `Pending -> {NoWinner, Winner}`,
/// orders move `open -> {tracking, paid, expired}`, bids move
/// `pending -> settled`. No mutation ever reverses a transition.
#[derive(Debug, Clone)]
pub enum Mutation {
    DecideAuction {
        auction_id: AuctionId,
        decision: WinnerDecision,
    },
    ExtendAuction {
        auction_id: AuctionId,
        new_end: DateTime<Utc>,
    },
    InsertOrder {
        order: Box<Order>,
        items: Vec<OrderItem>,
    },
    /// Record an observed but unconfirmed funding transaction.
    AdoptTransaction {
        order_id: OrderId,
        txid: TxId,
        value: Sats,
    },
    /// Record (or re-record, after an RBF substitution) the funding
    /// transaction as confirmed and mark the order paid.
    ConfirmPayment {
        order_id: OrderId,
        txid: TxId,
        value: Sats,
        paid_at: DateTime<Utc>,
    },
    ExpireOrder {
        order_id: OrderId,
        expired_at: DateTime<Utc>,
    },
    /// Return quantity to a listing's stock after its order expired.
    RestoreStock {
        listing_id: ListingId,
        quantity: u32,
    },
    SettleBid {
        bid_id: BidId,
        settled_at: DateTime<Utc>,
    },
}

/// A staged batch of mutations. Committed all-or-nothing under one lock
/// acquisition; dropped without commit, it leaves the store untouched.
pub struct StoreTx {
    store: MarketStore,
    mutations: Vec<Mutation>,
}

impl StoreTx {
    pub(crate) fn new(store: MarketStore) -> Self {
        Self {
            store,
            mutations: Vec::new(),
        }
    }

    pub fn decide_auction(&mut self, auction_id: AuctionId, decision: WinnerDecision) {
        self.mutations.push(Mutation::DecideAuction {
            auction_id,
            decision,
        });
    }

    pub fn extend_auction(&mut self, auction_id: AuctionId, new_end: DateTime<Utc>) {
        self.mutations.push(Mutation::ExtendAuction {
            auction_id,
            new_end,
        });
    }

    pub fn insert_order(&mut self, order: Order, items: Vec<OrderItem>) {
        self.mutations.push(Mutation::InsertOrder {
            order: Box::new(order),
            items,
        });
    }

    pub fn adopt_transaction(&mut self, order_id: OrderId, txid: TxId, value: Sats) {
        self.mutations.push(Mutation::AdoptTransaction {
            order_id,
            txid,
            value,
        });
    }

    pub fn confirm_payment(
        &mut self,
        order_id: OrderId,
        txid: TxId,
        value: Sats,
        paid_at: DateTime<Utc>,
    ) {
        self.mutations.push(Mutation::ConfirmPayment {
            order_id,
            txid,
            value,
            paid_at,
        });
    }

    pub fn expire_order(&mut self, order_id: OrderId, expired_at: DateTime<Utc>) {
        self.mutations.push(Mutation::ExpireOrder {
            order_id,
            expired_at,
        });
    }

    pub fn restore_stock(&mut self, listing_id: ListingId, quantity: u32) {
        self.mutations.push(Mutation::RestoreStock {
            listing_id,
            quantity,
        });
    }

    pub fn settle_bid(&mut self, bid_id: BidId, settled_at: DateTime<Utc>) {
        self.mutations.push(Mutation::SettleBid { bid_id, settled_at });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Validate every staged mutation, then apply the whole batch and
    /// persist the snapshot. Validation happens before the first write, so
    /// a guard rejection leaves the store exactly as it was.
    pub fn commit(self) -> Result<()> {
        let mut tables = self.store.lock();
        for mutation in &self.mutations {
            validate(&tables, mutation)?;
        }
        let count = self.mutations.len();
        for mutation in self.mutations {
            apply(&mut tables, mutation);
        }
        debug!(mutations = count, "committed store transaction");
        self.store.persist(&tables)
    }
}

fn validate(tables: &Tables, mutation: &Mutation) -> Result<()> {
    match mutation {
        Mutation::DecideAuction { auction_id, .. } => {
            let auction = tables
                .auctions
                .get(auction_id)
                .ok_or(MarketError::AuctionNotFound(*auction_id))?;
            if auction.decision.is_decided() {
                return Err(MarketError::AuctionAlreadyDecided(*auction_id));
            }
        }
        Mutation::ExtendAuction { auction_id, .. } => {
            tables
                .auctions
                .get(auction_id)
                .ok_or(MarketError::AuctionNotFound(*auction_id))?;
        }
        Mutation::InsertOrder { order, items } => {
            if tables.orders.contains_key(&order.id) {
                return Err(MarketError::DuplicateOrder(order.id));
            }
            for item in items {
                if let Some(listing_id) = item.source.listing_id() {
                    let listing = tables
                        .listings
                        .get(&listing_id)
                        .ok_or(MarketError::ListingNotFound(listing_id))?;
                    if listing.available_quantity < item.quantity {
                        return Err(MarketError::InsufficientStock {
                            listing: listing_id,
                            requested: item.quantity,
                            available: listing.available_quantity,
                        });
                    }
                }
            }
        }
        Mutation::AdoptTransaction { order_id, .. }
        | Mutation::ConfirmPayment { order_id, .. }
        | Mutation::ExpireOrder { order_id, .. } => {
            let order = tables
                .orders
                .get(order_id)
                .ok_or(MarketError::OrderNotFound(*order_id))?;
            if order.is_terminal() {
                return Err(MarketError::OrderAlreadyTerminal(*order_id));
            }
        }
        Mutation::RestoreStock { listing_id, .. } => {
            tables
                .listings
                .get(listing_id)
                .ok_or(MarketError::ListingNotFound(*listing_id))?;
        }
        Mutation::SettleBid { bid_id, .. } => {
            let bid = tables
                .bids
                .get(bid_id)
                .ok_or(MarketError::BidNotFound(*bid_id))?;
            if bid.is_settled() {
                return Err(MarketError::BidAlreadySettled(*bid_id));
            }
        }
    }
    Ok(())
}

/// Apply a validated mutation. Infallible by construction: every lookup here
/// was checked by `validate` with the same lock held.
fn apply(tables: &mut Tables, mutation: Mutation) {
    match mutation {
        Mutation::DecideAuction {
            auction_id,
            decision,
        } => {
            if let Some(auction) = tables.auctions.get_mut(&auction_id) {
                auction.decision = decision;
            }
        }
        Mutation::ExtendAuction {
            auction_id,
            new_end,
        } => {
            if let Some(auction) = tables.auctions.get_mut(&auction_id) {
                auction.end_at = new_end;
            }
        }
        Mutation::InsertOrder { order, items } => {
            for item in &items {
                if let Some(listing_id) = item.source.listing_id() {
                    if let Some(listing) = tables.listings.get_mut(&listing_id) {
                        listing.available_quantity -= item.quantity;
                    }
                }
            }
            tables.order_items.insert(order.id, items);
            tables.orders.insert(order.id, *order);
        }
        Mutation::AdoptTransaction {
            order_id,
            txid,
            value,
        } => {
            if let Some(order) = tables.orders.get_mut(&order_id) {
                order.txid = Some(txid);
                order.tx_value = Some(value);
                order.tx_confirmed = false;
            }
        }
        Mutation::ConfirmPayment {
            order_id,
            txid,
            value,
            paid_at,
        } => {
            if let Some(order) = tables.orders.get_mut(&order_id) {
                order.txid = Some(txid);
                order.tx_value = Some(value);
                order.tx_confirmed = true;
                order.paid_at = Some(paid_at);
            }
        }
        Mutation::ExpireOrder {
            order_id,
            expired_at,
        } => {
            if let Some(order) = tables.orders.get_mut(&order_id) {
                order.expired_at = Some(expired_at);
            }
        }
        Mutation::RestoreStock {
            listing_id,
            quantity,
        } => {
            if let Some(listing) = tables.listings.get_mut(&listing_id) {
                listing.available_quantity += quantity;
            }
        }
        Mutation::SettleBid { bid_id, settled_at } => {
            if let Some(bid) = tables.bids.get_mut(&bid_id) {
                bid.settled_at = Some(settled_at);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_types::{Auction, Bid, IdentityKey, ItemRef, Listing, Seller};

    fn store_with_seller() -> (MarketStore, Seller) {
        let store = MarketStore::in_memory();
        let seller = Seller::dummy([1u8; 32]);
        store.insert_seller(seller.clone()).unwrap();
        (store, seller)
    }

    #[test]
    fn decide_auction_once() {
        let (store, seller) = store_with_seller();
        let auction = Auction::dummy(seller.id, 0, Utc::now());
        store.insert_auction(auction.clone()).unwrap();

        let mut tx = store.begin();
        tx.decide_auction(auction.id, WinnerDecision::NoWinner);
        tx.commit().unwrap();

        let mut tx = store.begin();
        tx.decide_auction(auction.id, WinnerDecision::NoWinner);
        let err = tx.commit().unwrap_err();
        assert!(matches!(err, MarketError::AuctionAlreadyDecided(id) if id == auction.id));
    }

    #[test]
    fn terminal_order_rejects_all_transitions() {
        let (store, seller) = store_with_seller();
        let buyer = IdentityKey::from_pubkey([2u8; 32]);
        let order = Order::dummy(seller.id, buyer, 1000);

        let mut tx = store.begin();
        tx.insert_order(order.clone(), Vec::new());
        tx.commit().unwrap();

        let mut tx = store.begin();
        tx.expire_order(order.id, Utc::now());
        tx.commit().unwrap();

        let mut tx = store.begin();
        tx.confirm_payment(order.id, TxId::new("aa".repeat(32)), 1000, Utc::now());
        assert!(matches!(
            tx.commit().unwrap_err(),
            MarketError::OrderAlreadyTerminal(_)
        ));

        let mut tx = store.begin();
        tx.expire_order(order.id, Utc::now());
        assert!(matches!(
            tx.commit().unwrap_err(),
            MarketError::OrderAlreadyTerminal(_)
        ));
    }

    #[test]
    fn insert_order_decrements_stock_and_guards_underflow() {
        let (store, seller) = store_with_seller();
        let listing = Listing::dummy(seller.id, 5000, 3);
        store.insert_listing(listing.clone()).unwrap();
        let buyer = IdentityKey::from_pubkey([3u8; 32]);

        let order = Order::dummy(seller.id, buyer, 10_000);
        let mut tx = store.begin();
        tx.insert_order(
            order.clone(),
            vec![OrderItem {
                order_id: order.id,
                source: ItemRef::Listing(listing.id),
                quantity: 2,
            }],
        );
        tx.commit().unwrap();
        assert_eq!(store.listing(listing.id).unwrap().available_quantity, 1);

        let second = Order::dummy(seller.id, buyer, 10_000);
        let mut tx = store.begin();
        tx.insert_order(
            second.clone(),
            vec![OrderItem {
                order_id: second.id,
                source: ItemRef::Listing(listing.id),
                quantity: 2,
            }],
        );
        let err = tx.commit().unwrap_err();
        assert!(matches!(err, MarketError::InsufficientStock { .. }));
        // Guard rejection leaves everything untouched.
        assert_eq!(store.listing(listing.id).unwrap().available_quantity, 1);
        assert!(store.order(second.id).is_err());
    }

    #[test]
    fn restore_stock_roundtrip() {
        let (store, seller) = store_with_seller();
        let listing = Listing::dummy(seller.id, 5000, 5);
        store.insert_listing(listing.clone()).unwrap();

        let mut tx = store.begin();
        tx.restore_stock(listing.id, 2);
        tx.commit().unwrap();
        assert_eq!(store.listing(listing.id).unwrap().available_quantity, 7);
    }

    #[test]
    fn settle_bid_once() {
        let (store, seller) = store_with_seller();
        let auction = Auction::dummy(seller.id, 0, Utc::now());
        store.insert_auction(auction.clone()).unwrap();
        let bidder = IdentityKey::from_pubkey([4u8; 32]);
        let bid = Bid::dummy_pending_deposit(auction.id, 100, bidder);
        store.insert_bid(bid.clone()).unwrap();

        let mut tx = store.begin();
        tx.settle_bid(bid.id, Utc::now());
        tx.commit().unwrap();
        assert!(store.bid(bid.id).unwrap().is_settled());

        let mut tx = store.begin();
        tx.settle_bid(bid.id, Utc::now());
        assert!(matches!(
            tx.commit().unwrap_err(),
            MarketError::BidAlreadySettled(_)
        ));
    }

    #[test]
    fn dropped_tx_is_rollback() {
        let (store, seller) = store_with_seller();
        let auction = Auction::dummy(seller.id, 0, Utc::now());
        store.insert_auction(auction.clone()).unwrap();

        let mut tx = store.begin();
        tx.decide_auction(auction.id, WinnerDecision::NoWinner);
        drop(tx);

        assert_eq!(
            store.auction(auction.id).unwrap().decision,
            WinnerDecision::Pending
        );
    }

    #[test]
    fn rbf_confirm_overwrites_tracked_txid() {
        let (store, seller) = store_with_seller();
        let buyer = IdentityKey::from_pubkey([5u8; 32]);
        let order = Order::dummy(seller.id, buyer, 50_000);

        let mut tx = store.begin();
        tx.insert_order(order.clone(), Vec::new());
        tx.commit().unwrap();

        let mut tx = store.begin();
        tx.adopt_transaction(order.id, TxId::new("aa".repeat(32)), 50_000);
        tx.commit().unwrap();
        let tracked = store.order(order.id).unwrap();
        assert!(tracked.is_tracking_unconfirmed());

        let mut tx = store.begin();
        tx.confirm_payment(order.id, TxId::new("bb".repeat(32)), 50_000, Utc::now());
        tx.commit().unwrap();
        let paid = store.order(order.id).unwrap();
        assert_eq!(paid.txid.unwrap().as_str(), "bb".repeat(32));
        assert!(paid.tx_confirmed);
        assert!(paid.paid_at.is_some());
    }
}
