//! The publisher trait: one transport method, domain helpers on top.

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use serde_json::json;
use tracing::error;

use gavel_types::constants::{BID_STATUS_EVENT_KIND, DM_EVENT_KIND, PRODUCT_EVENT_KIND};
use gavel_types::{Auction, EventId, IdentityKey, Listing, Seller};

use crate::event::RelayEvent;
use crate::seal::seal_dm;

/// Status announced for a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidStatus {
    /// The bid won its auction.
    Winner,
    /// A deposit-gated bid became eligible.
    Accepted,
}

impl BidStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Winner => "winner",
            Self::Accepted => "accepted",
        }
    }
}

/// Optional fields of a bid-status event.
#[derive(Debug, Clone, Default)]
pub struct BidStatusOpts {
    pub message: Option<String>,
    /// Seconds the auction end moved out by, when the anti-sniping policy
    /// fired. Zero is omitted from the event.
    pub duration_extended: i64,
    /// Extra tags appended after the two `e` tags (e.g. the winner's
    /// identity as a `p` tag).
    pub extra_tags: Vec<Vec<String>>,
}

impl BidStatusOpts {
    /// Tag the given identity with a `p` tag (winner announcements).
    #[must_use]
    pub fn tagging(identity: &IdentityKey) -> Self {
        Self {
            extra_tags: vec![vec!["p".to_string(), identity.to_hex()]],
            ..Self::default()
        }
    }

    /// Carry the anti-sniping extension, when one applied.
    #[must_use]
    pub fn extended_by(duration_extended: i64) -> Self {
        Self {
            duration_extended,
            ..Self::default()
        }
    }
}

/// Publishes signed domain events to the relay network.
///
/// Implementations provide the transport ([`RelayPublisher::publish_event`]);
/// the domain helpers are shared. Every helper returns the new event's id on
/// success and `None` on failure — the engine treats `None` as "nothing
/// happened, retry on a later pass" and commits no state for it.
#[async_trait]
pub trait RelayPublisher: Send + Sync {
    /// Deliver a signed event. Returns `false` on any failure.
    async fn publish_event(&self, event: &RelayEvent) -> bool;

    /// Send an encrypted direct message; the recipient is `p`-tagged so the
    /// relay can route it.
    async fn send_direct_message(
        &self,
        sender: &SigningKey,
        recipient: &IdentityKey,
        body: &str,
    ) -> Option<EventId> {
        let sealed = match seal_dm(sender, recipient, body) {
            Ok(sealed) => sealed,
            Err(e) => {
                error!(recipient = %recipient, "failed to seal direct message: {e}");
                return None;
            }
        };
        let tags = vec![vec!["p".to_string(), recipient.to_hex()]];
        let event = match RelayEvent::sign(sender, DM_EVENT_KIND, tags, sealed) {
            Ok(event) => event,
            Err(e) => {
                error!(recipient = %recipient, "failed to sign direct message: {e}");
                return None;
            }
        };
        if self.publish_event(&event).await {
            Some(event.id)
        } else {
            None
        }
    }

    /// Announce a bid's status, referencing the auction's event and the
    /// bid's originating event.
    async fn publish_bid_status(
        &self,
        auction: &Auction,
        seller: &Seller,
        bid_event_id: &EventId,
        status: BidStatus,
        opts: BidStatusOpts,
    ) -> Option<EventId> {
        let mut content = json!({ "status": status.as_str() });
        if let Some(message) = &opts.message {
            content["message"] = json!(message);
        }
        if opts.duration_extended != 0 {
            content["duration_extended"] = json!(opts.duration_extended);
        }

        let mut tags = vec![
            vec!["e".to_string(), auction.event_id.as_str().to_string()],
            vec!["e".to_string(), bid_event_id.as_str().to_string()],
        ];
        tags.extend(opts.extra_tags);

        let event = match RelayEvent::sign(
            &seller.signing_key(),
            BID_STATUS_EVENT_KIND,
            tags,
            content.to_string(),
        ) {
            Ok(event) => event,
            Err(e) => {
                error!(bid_event = %bid_event_id, "failed to sign bid status: {e}");
                return None;
            }
        };
        if self.publish_event(&event).await {
            Some(event.id)
        } else {
            None
        }
    }

    /// (Re-)publish a listing's current state as its replaceable product
    /// event, keyed by the listing id in the `d` tag.
    async fn publish_product(&self, listing: &Listing, seller: &Seller) -> Option<EventId> {
        let content = json!({
            "id": listing.id.0.to_string(),
            "name": listing.title,
            "price": listing.price,
            "quantity": listing.available_quantity,
        });
        let tags = vec![vec!["d".to_string(), listing.id.0.to_string()]];

        let event = match RelayEvent::sign(
            &seller.signing_key(),
            PRODUCT_EVENT_KIND,
            tags,
            content.to_string(),
        ) {
            Ok(event) => event,
            Err(e) => {
                error!(listing = %listing.id, "failed to sign product event: {e}");
                return None;
            }
        };
        if self.publish_event(&event).await {
            Some(event.id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRelay;
    use crate::seal::unseal_dm;

    fn seller() -> Seller {
        Seller::dummy([11u8; 32])
    }

    #[tokio::test]
    async fn dm_is_sealed_and_tagged() {
        let relay = MockRelay::new();
        let seller = seller();
        let recipient = IdentityKey::from_pubkey([12u8; 32]);

        let event_id = relay
            .send_direct_message(&seller.signing_key(), &recipient, "order body")
            .await
            .unwrap();

        let events = relay.events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.id, event_id);
        assert_eq!(event.kind, DM_EVENT_KIND);
        assert_eq!(event.tag_value("p"), Some(recipient.to_hex().as_str()));
        // Content is sealed, not plaintext.
        assert!(!event.content.contains("order body"));
        let opened = unseal_dm(&seller.signing_key(), &recipient, &event.content).unwrap();
        assert_eq!(opened, "order body");
    }

    #[tokio::test]
    async fn bid_status_references_auction_and_bid() {
        let relay = MockRelay::new();
        let seller = seller();
        let auction = Auction::dummy(seller.id, 1000, chrono::Utc::now());
        let bid_event = EventId::new("cd".repeat(32));
        let winner = IdentityKey::from_pubkey([13u8; 32]);

        relay
            .publish_bid_status(
                &auction,
                &seller,
                &bid_event,
                BidStatus::Winner,
                BidStatusOpts::tagging(&winner),
            )
            .await
            .unwrap();

        let event = relay.events().pop().unwrap();
        assert_eq!(event.kind, BID_STATUS_EVENT_KIND);
        assert_eq!(event.tag_value("e"), Some(auction.event_id.as_str()));
        assert_eq!(event.tag_value("p"), Some(winner.to_hex().as_str()));
        let content: serde_json::Value = serde_json::from_str(&event.content).unwrap();
        assert_eq!(content["status"], "winner");
        assert!(content.get("duration_extended").is_none());
        event.verify().unwrap();
    }

    #[tokio::test]
    async fn accepted_status_carries_extension() {
        let relay = MockRelay::new();
        let seller = seller();
        let auction = Auction::dummy(seller.id, 1000, chrono::Utc::now());
        let bid_event = EventId::new("ef".repeat(32));

        relay
            .publish_bid_status(
                &auction,
                &seller,
                &bid_event,
                BidStatus::Accepted,
                BidStatusOpts::extended_by(180),
            )
            .await
            .unwrap();

        let event = relay.events().pop().unwrap();
        let content: serde_json::Value = serde_json::from_str(&event.content).unwrap();
        assert_eq!(content["status"], "accepted");
        assert_eq!(content["duration_extended"], 180);
    }

    #[tokio::test]
    async fn product_event_carries_stock() {
        let relay = MockRelay::new();
        let seller = seller();
        let listing = Listing::dummy(seller.id, 5000, 7);

        relay.publish_product(&listing, &seller).await.unwrap();

        let event = relay.events().pop().unwrap();
        assert_eq!(event.kind, PRODUCT_EVENT_KIND);
        assert_eq!(event.tag_value("d"), Some(listing.id.0.to_string().as_str()));
        let content: serde_json::Value = serde_json::from_str(&event.content).unwrap();
        assert_eq!(content["quantity"], 7);
        assert_eq!(content["price"], 5000);
    }

    #[tokio::test]
    async fn failed_publish_returns_none() {
        let relay = MockRelay::new();
        relay.set_fail_all(true);
        let seller = seller();
        let recipient = IdentityKey::from_pubkey([14u8; 32]);

        let result = relay
            .send_direct_message(&seller.signing_key(), &recipient, "body")
            .await;
        assert!(result.is_none());
        assert!(relay.events().is_empty());
    }
}
