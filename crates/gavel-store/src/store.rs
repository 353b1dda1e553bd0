//! The store handle: tables, queries, seeding and snapshot persistence.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gavel_types::{
    Auction, AuctionId, Bid, BidId, IdentityKey, Listing, ListingId, MarketError, Order,
    OrderId, OrderItem, Result, Seller, SellerId,
};

use crate::tx::StoreTx;

/// The raw table set. Serialized wholesale as the durability snapshot.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    pub sellers: HashMap<SellerId, Seller>,
    pub listings: HashMap<ListingId, Listing>,
    pub auctions: HashMap<AuctionId, Auction>,
    pub bids: HashMap<BidId, Bid>,
    pub orders: HashMap<OrderId, Order>,
    pub order_items: HashMap<OrderId, Vec<OrderItem>>,
}

/// Cheaply cloneable handle over the shared table set.
#[derive(Clone, Default)]
pub struct MarketStore {
    inner: Arc<Mutex<Tables>>,
    snapshot_path: Option<Arc<PathBuf>>,
}

impl MarketStore {
    /// A volatile store for tests and dry runs.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store backed by a JSON snapshot file. Loads the snapshot if it
    /// exists; otherwise starts empty and creates it on the first commit.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            Tables::default()
        };
        Ok(Self {
            inner: Arc::new(Mutex::new(tables)),
            snapshot_path: Some(Arc::new(path)),
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Tables> {
        self.inner.lock().expect("store lock poisoned")
    }

    /// Persist the current table set when a snapshot path is configured.
    /// Called with the lock held so snapshots always reflect a committed
    /// state, never a half-applied batch.
    pub(crate) fn persist(&self, tables: &Tables) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(tables)?)?;
        std::fs::rename(&tmp, path.as_path())?;
        Ok(())
    }

    /// Begin a staged transaction.
    #[must_use]
    pub fn begin(&self) -> StoreTx {
        StoreTx::new(self.clone())
    }

    // =====================================================================
    // Seeding (creation-time writes outside the loop state machines)
    // =====================================================================

    pub fn insert_seller(&self, seller: Seller) -> Result<()> {
        let mut tables = self.lock();
        tables.sellers.insert(seller.id, seller);
        self.persist(&tables)
    }

    pub fn insert_listing(&self, listing: Listing) -> Result<()> {
        let mut tables = self.lock();
        tables.listings.insert(listing.id, listing);
        self.persist(&tables)
    }

    pub fn insert_auction(&self, auction: Auction) -> Result<()> {
        let mut tables = self.lock();
        tables.auctions.insert(auction.id, auction);
        self.persist(&tables)
    }

    pub fn insert_bid(&self, bid: Bid) -> Result<()> {
        let mut tables = self.lock();
        tables.bids.insert(bid.id, bid);
        self.persist(&tables)
    }

    // =====================================================================
    // Getters
    // =====================================================================

    pub fn auction(&self, id: AuctionId) -> Result<Auction> {
        self.lock()
            .auctions
            .get(&id)
            .cloned()
            .ok_or(MarketError::AuctionNotFound(id))
    }

    pub fn bid(&self, id: BidId) -> Result<Bid> {
        self.lock()
            .bids
            .get(&id)
            .cloned()
            .ok_or(MarketError::BidNotFound(id))
    }

    pub fn order(&self, id: OrderId) -> Result<Order> {
        self.lock()
            .orders
            .get(&id)
            .cloned()
            .ok_or(MarketError::OrderNotFound(id))
    }

    pub fn listing(&self, id: ListingId) -> Result<Listing> {
        self.lock()
            .listings
            .get(&id)
            .cloned()
            .ok_or(MarketError::ListingNotFound(id))
    }

    pub fn seller(&self, id: SellerId) -> Result<Seller> {
        self.lock()
            .sellers
            .get(&id)
            .cloned()
            .ok_or(MarketError::SellerNotFound(id))
    }

    // =====================================================================
    // Finalizer queries
    // =====================================================================

    /// Auctions past their end time with no recorded winner decision,
    /// oldest ending first.
    #[must_use]
    pub fn auctions_due(&self, now: DateTime<Utc>) -> Vec<Auction> {
        let tables = self.lock();
        let mut due: Vec<Auction> = tables
            .auctions
            .values()
            .filter(|a| a.has_ended(now) && !a.decision.is_decided())
            .cloned()
            .collect();
        due.sort_by_key(|a| (a.end_at, a.id));
        due
    }

    /// The highest settled bid for an auction, optionally restricted to
    /// amounts strictly below `below` (used by the disqualification scan).
    /// Ties go to the earlier bid.
    #[must_use]
    pub fn top_bid(&self, auction_id: AuctionId, below: Option<u64>) -> Option<Bid> {
        let tables = self.lock();
        tables
            .bids
            .values()
            .filter(|b| b.auction_id == auction_id && b.is_settled())
            .filter(|b| below.is_none_or(|limit| b.amount < limit))
            .max_by(|a, b| {
                a.amount
                    .cmp(&b.amount)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            })
            .cloned()
    }

    /// Whether this buyer already let an order containing an item of this
    /// auction expire — the disqualification condition.
    #[must_use]
    pub fn buyer_has_expired_auction_order(
        &self,
        buyer: &IdentityKey,
        auction_id: AuctionId,
    ) -> bool {
        let tables = self.lock();
        tables
            .orders
            .values()
            .filter(|o| o.buyer == *buyer && o.expired_at.is_some())
            .any(|o| {
                tables
                    .order_items
                    .get(&o.id)
                    .is_some_and(|items| {
                        items.iter().any(|i| i.source.auction_id() == Some(auction_id))
                    })
            })
    }

    // =====================================================================
    // Settlement queries
    // =====================================================================

    /// Non-terminal orders with an on-chain address, oldest requested first.
    #[must_use]
    pub fn open_payable_orders(&self) -> Vec<Order> {
        let tables = self.lock();
        let mut open: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.on_chain_address.is_some() && !o.is_terminal())
            .cloned()
            .collect();
        open.sort_by_key(|o| (o.requested_at, o.id));
        open
    }

    #[must_use]
    pub fn items_for_order(&self, order_id: OrderId) -> Vec<OrderItem> {
        self.lock()
            .order_items
            .get(&order_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether any of the order's items is a deposit product, i.e. paying
    /// the order satisfies the buyer's bid-deposit precondition.
    #[must_use]
    pub fn order_grants_deposit(&self, order_id: OrderId) -> bool {
        let tables = self.lock();
        tables.order_items.get(&order_id).is_some_and(|items| {
            items.iter().any(|item| {
                item.source
                    .listing_id()
                    .and_then(|id| tables.listings.get(&id))
                    .is_some_and(|listing| listing.deposit_product)
            })
        })
    }

    /// Buyers holding a paid order that grants the bid-deposit. Scanned
    /// every pass so a crash between payment commit and bid unlock heals on
    /// the next pass.
    #[must_use]
    pub fn paid_deposit_buyers(&self) -> Vec<IdentityKey> {
        let tables = self.lock();
        let buyers: BTreeSet<IdentityKey> = tables
            .orders
            .values()
            .filter(|o| o.paid_at.is_some())
            .filter(|o| {
                tables.order_items.get(&o.id).is_some_and(|items| {
                    items.iter().any(|item| {
                        item.source
                            .listing_id()
                            .and_then(|id| tables.listings.get(&id))
                            .is_some_and(|listing| listing.deposit_product)
                    })
                })
            })
            .map(|o| o.buyer)
            .collect();
        buyers.into_iter().collect()
    }

    /// This buyer's deposit-gated bids that are still waiting to unlock,
    /// oldest first.
    #[must_use]
    pub fn pending_deposit_bids(&self, buyer: &IdentityKey) -> Vec<Bid> {
        let tables = self.lock();
        let mut bids: Vec<Bid> = tables
            .bids
            .values()
            .filter(|b| b.bidder == Some(*buyer) && b.requires_deposit && !b.is_settled())
            .cloned()
            .collect();
        bids.sort_by_key(|b| (b.created_at, b.id));
        bids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gavel_types::ItemRef;

    fn seeded_store() -> (MarketStore, Seller) {
        let store = MarketStore::in_memory();
        let seller = Seller::dummy([1u8; 32]);
        store.insert_seller(seller.clone()).unwrap();
        (store, seller)
    }

    #[test]
    fn auctions_due_excludes_running_and_decided() {
        let (store, seller) = seeded_store();
        let now = Utc::now();

        let ended = Auction::dummy(seller.id, 0, now - Duration::minutes(1));
        let running = Auction::dummy(seller.id, 0, now + Duration::minutes(1));
        let mut decided = Auction::dummy(seller.id, 0, now - Duration::minutes(5));
        decided.decision = gavel_types::WinnerDecision::NoWinner;

        store.insert_auction(ended.clone()).unwrap();
        store.insert_auction(running).unwrap();
        store.insert_auction(decided).unwrap();

        let due = store.auctions_due(now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, ended.id);
    }

    #[test]
    fn top_bid_respects_below_and_settlement() {
        let (store, seller) = seeded_store();
        let auction = Auction::dummy(seller.id, 0, Utc::now());
        store.insert_auction(auction.clone()).unwrap();

        let bidder = IdentityKey::from_pubkey([2u8; 32]);
        let high = Bid::dummy(auction.id, 100, Some(bidder));
        let mid = Bid::dummy(auction.id, 80, Some(bidder));
        let unsettled = Bid::dummy_pending_deposit(auction.id, 90, bidder);

        store.insert_bid(high.clone()).unwrap();
        store.insert_bid(mid.clone()).unwrap();
        store.insert_bid(unsettled).unwrap();

        assert_eq!(store.top_bid(auction.id, None).unwrap().id, high.id);
        // Excluding amounts at or above 100 picks the 80 bid; the unsettled
        // 90 bid never participates.
        assert_eq!(store.top_bid(auction.id, Some(100)).unwrap().id, mid.id);
        assert!(store.top_bid(auction.id, Some(80)).is_none());
    }

    #[test]
    fn expired_auction_order_detected() {
        let (store, seller) = seeded_store();
        let auction = Auction::dummy(seller.id, 0, Utc::now());
        store.insert_auction(auction.clone()).unwrap();

        let buyer = IdentityKey::from_pubkey([3u8; 32]);
        let order = Order::dummy(seller.id, buyer, 1000);
        let items = vec![OrderItem {
            order_id: order.id,
            source: ItemRef::Auction(auction.id),
            quantity: 1,
        }];
        let mut tx = store.begin();
        tx.insert_order(order.clone(), items);
        tx.commit().unwrap();

        let mut tx = store.begin();
        tx.expire_order(order.id, Utc::now());
        tx.commit().unwrap();

        assert!(store.buyer_has_expired_auction_order(&buyer, auction.id));
        assert!(!store.buyer_has_expired_auction_order(
            &IdentityKey::from_pubkey([9u8; 32]),
            auction.id
        ));
    }

    #[test]
    fn open_payable_orders_filters_terminal_and_addressless() {
        let (store, seller) = seeded_store();
        let buyer = IdentityKey::from_pubkey([4u8; 32]);

        let open = Order::dummy(seller.id, buyer, 100);
        let mut no_address = Order::dummy(seller.id, buyer, 100);
        no_address.on_chain_address = None;
        let paid = Order::dummy(seller.id, buyer, 100);

        let mut tx = store.begin();
        tx.insert_order(open.clone(), Vec::new());
        tx.insert_order(no_address, Vec::new());
        tx.insert_order(paid.clone(), Vec::new());
        tx.commit().unwrap();

        let mut tx = store.begin();
        tx.confirm_payment(paid.id, gavel_types::TxId::new("ff".repeat(32)), 100, Utc::now());
        tx.commit().unwrap();

        let scanned = store.open_payable_orders();
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].id, open.id);
    }

    #[test]
    fn snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("market.json");

        let seller = Seller::dummy([7u8; 32]);
        let listing = Listing::dummy(seller.id, 5000, 10);
        {
            let store = MarketStore::open(&path).unwrap();
            store.insert_seller(seller.clone()).unwrap();
            store.insert_listing(listing.clone()).unwrap();
        }

        let reopened = MarketStore::open(&path).unwrap();
        assert_eq!(reopened.listing(listing.id).unwrap().available_quantity, 10);
        assert_eq!(reopened.seller(seller.id).unwrap().id, seller.id);
    }
}
