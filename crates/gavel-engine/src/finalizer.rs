//! The auction finalizer loop.
//!
//! Contract: for every auction whose end time has passed and whose decision
//! is still `Pending`, record the winner (or `NoWinner`) exactly once, and
//! open the winner's payment order in the same transaction as the decision.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use gavel_ledger::AddressProvider;
use gavel_relay::{BidStatus, BidStatusOpts, RelayPublisher};
use gavel_store::MarketStore;
use gavel_types::{
    Auction, Bid, EngineConfig, ItemRef, Order, OrderId, OrderItem, OrderRequest, Result,
    WinnerDecision,
};

use crate::saga::publish_then_commit;

pub struct AuctionFinalizer {
    store: MarketStore,
    relay: Arc<dyn RelayPublisher>,
    wallet: Arc<dyn AddressProvider>,
    config: EngineConfig,
}

impl AuctionFinalizer {
    #[must_use]
    pub fn new(
        store: MarketStore,
        relay: Arc<dyn RelayPublisher>,
        wallet: Arc<dyn AddressProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            relay,
            wallet,
            config,
        }
    }

    /// Poll until the shutdown signal flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("starting auction finalizer");
        loop {
            if let Err(e) = self.pass().await {
                error!("finalizer pass failed: {e}");
            }
            tokio::select! {
                () = tokio::time::sleep(self.config.cadence.finalize_interval()) => {}
                _ = shutdown.changed() => {
                    info!("auction finalizer shutting down");
                    return;
                }
            }
        }
    }

    /// One sweep over every due auction. A failure on one auction is logged
    /// and does not abort the sweep.
    pub async fn pass(&self) -> Result<()> {
        let now = Utc::now();
        for auction in self.store.auctions_due(now) {
            debug!(auction = %auction.id, "evaluating ended auction");
            if let Err(e) = self.finalize(&auction).await {
                error!(auction = %auction.id, "failed to finalize auction: {e}");
            }
        }
        Ok(())
    }

    /// Select the winning bid under the exclusion rules: a bidder who
    /// already let an order for this auction expire is disqualified, and so
    /// is every bid at or above the disqualified amount.
    fn eligible_top_bid(&self, auction: &Auction) -> Option<Bid> {
        let mut top = self.store.top_bid(auction.id, None);
        while let Some(bid) = top.as_ref() {
            let Some(bidder) = bid.bidder else { break };
            if !self
                .store
                .buyer_has_expired_auction_order(&bidder, auction.id)
            {
                break;
            }
            info!(
                auction = %auction.id,
                %bidder,
                "bidder has an expired order for this auction, picking the next bid"
            );
            top = self.store.top_bid(auction.id, Some(bid.amount));
        }
        top
    }

    async fn finalize(&self, auction: &Auction) -> Result<()> {
        let Some(bid) = self.eligible_top_bid(auction) else {
            return self.record_no_winner(auction);
        };
        if bid.amount < auction.reserve_price {
            return self.record_no_winner(auction);
        }

        info!(
            auction = %auction.id,
            bid = %bid.id,
            amount = bid.amount,
            "auction has a winner"
        );

        let Some(winner) = bid.bidder else {
            // Winner known only through a legacy channel: record the
            // decision, there is nobody to message and no order to open.
            let mut tx = self.store.begin();
            tx.decide_auction(auction.id, WinnerDecision::Winner(bid.id));
            return tx.commit();
        };

        let seller = self.store.seller(auction.seller_id)?;
        let on_chain_address = if seller.wallet.is_some() {
            match self.wallet.next_address(&seller).await {
                Ok(address) => Some(address),
                Err(e) => {
                    error!(
                        auction = %auction.id,
                        "address generation failed, auction skipped for this pass: {e}"
                    );
                    return Ok(());
                }
            }
        } else {
            None
        };

        // The order id is minted before anything is sent so the id the buyer
        // receives and the id the store persists are the same token.
        let order_id = OrderId::new();
        let request = OrderRequest::single_item(order_id, auction.id.0.to_string());
        let body = serde_json::to_string(&request)?;

        let effect = async {
            self.relay
                .publish_bid_status(
                    auction,
                    &seller,
                    &bid.event_id,
                    BidStatus::Winner,
                    BidStatusOpts::tagging(&winner),
                )
                .await?;
            self.relay
                .send_direct_message(&seller.signing_key(), &winner, &body)
                .await
        };

        let committed = publish_then_commit(effect, |dm_event_id| {
            let order = Order::new(
                seller.id,
                winner,
                dm_event_id.clone(),
                bid.amount,
                self.config.order_timeout_minutes,
                on_chain_address.clone(),
                seller.lightning_address.clone(),
            )
            .with_id(order_id);
            let item = OrderItem {
                order_id,
                source: ItemRef::Auction(auction.id),
                quantity: 1,
            };
            let mut tx = self.store.begin();
            tx.insert_order(order, vec![item]);
            tx.decide_auction(auction.id, WinnerDecision::Winner(bid.id));
            tx.commit()
        })
        .await?;

        if committed.is_none() {
            warn!(
                auction = %auction.id,
                "winner notification failed, auction will be re-evaluated next pass"
            );
        }
        Ok(())
    }

    fn record_no_winner(&self, auction: &Auction) -> Result<()> {
        info!(auction = %auction.id, "auction has no winner");
        let mut tx = self.store.begin();
        tx.decide_auction(auction.id, WinnerDecision::NoWinner);
        tx.commit()
    }
}
