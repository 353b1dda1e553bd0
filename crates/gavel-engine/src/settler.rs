//! The payment settlement loop.
//!
//! Contract: keep every non-terminal order's payment state consistent with
//! ledger reality, expire orders whose payment window ran out, and unlock
//! deposit-gated bids once their buyer's deposit order is paid.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{error, info, warn};

use gavel_ledger::{FundingTx, LedgerQuery};
use gavel_relay::{BidStatus, BidStatusOpts, RelayPublisher};
use gavel_store::MarketStore;
use gavel_types::{
    Bid, EngineConfig, Listing, MarketError, Order, OrderStatusUpdate, Result, Seller, TxId,
    UnderpaymentPolicy,
};

use crate::saga::publish_then_commit;

/// How one order's scan ended. Only `NoMatch` allows the timeout check.
enum Outcome {
    /// Payment confirmed and committed.
    Paid,
    /// An unconfirmed transaction was adopted and committed.
    Tracking,
    /// A transition matched but its notification failed; nothing committed,
    /// retried next pass.
    Deferred,
    /// The tracked transaction has not confirmed yet.
    Waiting,
    /// Two distinct transactions match the tracked value; flagged for manual
    /// inspection, no automatic resolution.
    Ambiguous,
    /// No transaction covered the order.
    NoMatch { saw_underpayment: bool },
}

pub struct PaymentSettler {
    store: MarketStore,
    ledger: Arc<dyn LedgerQuery>,
    relay: Arc<dyn RelayPublisher>,
    config: EngineConfig,
}

impl PaymentSettler {
    #[must_use]
    pub fn new(
        store: MarketStore,
        ledger: Arc<dyn LedgerQuery>,
        relay: Arc<dyn RelayPublisher>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            relay,
            config,
        }
    }

    /// Poll until the shutdown signal flips. A failed pass is logged and the
    /// loop continues — staged work from the failed pass was dropped with
    /// its transactions, so nothing half-applied survives into the next one.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("starting payment settler");
        loop {
            if let Err(e) = self.pass().await {
                error!("settlement pass failed, staged work rolled back: {e}");
            }
            tokio::select! {
                () = tokio::time::sleep(self.config.cadence.settle_interval()) => {}
                _ = shutdown.changed() => {
                    info!("payment settler shutting down");
                    return;
                }
            }
        }
    }

    /// One pass: scan every open payable order, then unlock deposit bids.
    pub async fn pass(&self) -> Result<()> {
        for order in self.store.open_payable_orders() {
            match self.settle_order(&order).await {
                Ok(()) => {}
                Err(MarketError::LedgerUnavailable { reason }) => {
                    warn!(
                        order = %order.id,
                        "ledger unavailable ({reason}), napping before the next order"
                    );
                    tokio::time::sleep(self.config.cadence.ledger_cooldown()).await;
                }
                Err(e) => return Err(e),
            }
        }
        self.unlock_deposit_bids().await;
        Ok(())
    }

    async fn settle_order(&self, order: &Order) -> Result<()> {
        let Some(address) = order.on_chain_address.as_deref() else {
            return Ok(());
        };
        let txs = self.ledger.funding_txs(address).await?;
        let seller = self.store.seller(order.seller_id)?;
        let now = Utc::now();

        let outcome = if let Some(tracked) = order.txid.clone() {
            self.check_tracked(order, &seller, &tracked, &txs, now)
                .await?
        } else {
            self.match_untracked(order, &seller, &txs, now).await?
        };

        if let Outcome::NoMatch { saw_underpayment } = outcome {
            let held =
                saw_underpayment && self.config.underpayment == UnderpaymentPolicy::Hold;
            if !held && order.is_past_timeout(now) {
                self.expire_order(order, &seller, now).await?;
            }
        }
        Ok(())
    }

    /// Step 2: the order already tracks a transaction that has not confirmed
    /// yet. Look for its confirmation — under the tracked txid, or under a
    /// replacement with the same value (replace-by-fee keeps the paid value
    /// while changing the id).
    async fn check_tracked(
        &self,
        order: &Order,
        seller: &Seller,
        tracked: &TxId,
        txs: &[FundingTx],
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        let tx = match txs.iter().find(|tx| tx.confirmed && tx.txid == *tracked) {
            Some(tx) => tx,
            None => {
                let substitutes: Vec<&FundingTx> = txs
                    .iter()
                    .filter(|tx| tx.confirmed && Some(tx.value) == order.tx_value)
                    .collect();
                match substitutes[..] {
                    [] => return Ok(Outcome::Waiting),
                    [tx] => {
                        info!(
                            order = %order.id,
                            old_txid = %tracked,
                            new_txid = %tx.txid,
                            "transaction id changed (replace-by-fee), adopting replacement"
                        );
                        tx
                    }
                    _ => {
                        warn!(
                            order = %order.id,
                            candidates = substitutes.len(),
                            value = ?order.tx_value,
                            "multiple confirmed transactions match the tracked value, \
                             leaving order for manual inspection"
                        );
                        return Ok(Outcome::Ambiguous);
                    }
                }
            }
        };

        info!(order = %order.id, txid = %tx.txid, "funding transaction confirmed");
        self.confirm_payment(order, seller, tx, now).await
    }

    /// Step 3: no transaction tracked yet. Adopt the first transaction that
    /// covers the total; log any transaction that underpays.
    async fn match_untracked(
        &self,
        order: &Order,
        seller: &Seller,
        txs: &[FundingTx],
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        let mut saw_underpayment = false;
        for tx in txs {
            if tx.value < order.total {
                warn!(
                    order = %order.id,
                    txid = %tx.txid,
                    total = order.total,
                    value = tx.value,
                    "transaction value below order total, left for manual follow-up"
                );
                saw_underpayment = true;
                continue;
            }

            info!(
                order = %order.id,
                txid = %tx.txid,
                confirmed = tx.confirmed,
                "found funding transaction"
            );
            if tx.confirmed {
                return self.confirm_payment(order, seller, tx, now).await;
            }
            return self.adopt_unconfirmed(order, seller, tx).await;
        }
        Ok(Outcome::NoMatch { saw_underpayment })
    }

    /// Confirm + pay: message first, commit second.
    async fn confirm_payment(
        &self,
        order: &Order,
        seller: &Seller,
        tx: &FundingTx,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        let update = OrderStatusUpdate::payment_confirmed(order.id, &tx.txid);
        let body = serde_json::to_string(&update)?;
        let sender = seller.signing_key();
        let effect = self
            .relay
            .send_direct_message(&sender, &order.buyer, &body);
        let committed = publish_then_commit(effect, |_| {
            let mut stx = self.store.begin();
            stx.confirm_payment(order.id, tx.txid.clone(), tx.value, now);
            stx.commit()
        })
        .await?;
        Ok(if committed.is_some() {
            Outcome::Paid
        } else {
            Outcome::Deferred
        })
    }

    /// Track an unconfirmed transaction: message first, commit second.
    async fn adopt_unconfirmed(
        &self,
        order: &Order,
        seller: &Seller,
        tx: &FundingTx,
    ) -> Result<Outcome> {
        let update = OrderStatusUpdate::awaiting_confirmation(order.id, &tx.txid);
        let body = serde_json::to_string(&update)?;
        let sender = seller.signing_key();
        let effect = self
            .relay
            .send_direct_message(&sender, &order.buyer, &body);
        let committed = publish_then_commit(effect, |_| {
            let mut stx = self.store.begin();
            stx.adopt_transaction(order.id, tx.txid.clone(), tx.value);
            stx.commit()
        })
        .await?;
        Ok(if committed.is_some() {
            Outcome::Tracking
        } else {
            Outcome::Deferred
        })
    }

    /// The payment window ran out with nothing on the address. Expire the
    /// order, return fixed-price stock, re-publish the affected listings and
    /// tell the buyer. Auction items are deliberately not restocked: the
    /// finalizer's disqualification scan picks the next bidder instead.
    async fn expire_order(
        &self,
        order: &Order,
        seller: &Seller,
        now: DateTime<Utc>,
    ) -> Result<()> {
        warn!(order = %order.id, "order past its payment window, expiring");

        let mut stx = self.store.begin();
        stx.expire_order(order.id, now);

        let mut republish: Vec<Listing> = Vec::new();
        for item in self.store.items_for_order(order.id) {
            if let Some(listing_id) = item.source.listing_id() {
                stx.restore_stock(listing_id, item.quantity);
                let mut listing = self.store.listing(listing_id)?;
                // The event carries the stock as it will read after commit.
                listing.available_quantity += item.quantity;
                republish.push(listing);
            }
        }

        let update = OrderStatusUpdate::expired(order.id);
        let body = serde_json::to_string(&update)?;
        let effect = async {
            for listing in &republish {
                // Best-effort: a missed product event leaves stale stock on
                // the relay until the next listing update, nothing worse.
                if self.relay.publish_product(listing, seller).await.is_none() {
                    warn!(listing = %listing.id, "failed to re-publish listing after restock");
                }
            }
            self.relay
                .send_direct_message(&seller.signing_key(), &order.buyer, &body)
                .await
        };

        let committed = publish_then_commit(effect, |_| stx.commit()).await?;
        if committed.is_none() {
            warn!(
                order = %order.id,
                "expiry notification failed, order will be re-expired next pass"
            );
        }
        Ok(())
    }

    /// Step 4: unlock pending deposit-gated bids for every buyer holding a
    /// paid deposit order. Runs over all paid deposit orders — not just ones
    /// paid this pass — so a crash between payment commit and unlock heals
    /// here without re-sending the payment message.
    async fn unlock_deposit_bids(&self) {
        for buyer in self.store.paid_deposit_buyers() {
            for bid in self.store.pending_deposit_bids(&buyer) {
                if let Err(e) = self.unlock_bid(&bid).await {
                    error!(bid = %bid.id, "failed to unlock bid: {e}");
                }
            }
        }
    }

    async fn unlock_bid(&self, bid: &Bid) -> Result<()> {
        let auction = self.store.auction(bid.auction_id)?;
        let seller = self.store.seller(auction.seller_id)?;
        let now = Utc::now();

        let extension = auction.extension_after(now, self.config.extension_window());
        let duration_extended = extension.map_or(0, |(_, secs)| secs);

        let effect = self.relay.publish_bid_status(
            &auction,
            &seller,
            &bid.event_id,
            BidStatus::Accepted,
            BidStatusOpts::extended_by(duration_extended),
        );
        let committed = publish_then_commit(effect, |_| {
            let mut stx = self.store.begin();
            stx.settle_bid(bid.id, now);
            if let Some((new_end, _)) = extension {
                stx.extend_auction(auction.id, new_end);
            }
            stx.commit()
        })
        .await?;

        if committed.is_some() {
            info!(bid = %bid.id, auction = %auction.id, "bid accepted after deposit settled");
        }
        Ok(())
    }
}
