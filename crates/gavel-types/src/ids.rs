//! Globally unique identifiers used throughout Gavel.
//!
//! All entity IDs use UUIDv7 for time-ordered lexicographic sorting.
//! `IdentityKey` is the raw public key a buyer or bidder is known by on the
//! relay network; `TxId` and `EventId` are opaque hex tokens minted by the
//! external ledger and relay respectively.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            #[must_use]
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if $prefix.is_empty() {
                    write!(f, "{}", self.0)
                } else {
                    write!(f, "{}:{}", $prefix, self.0)
                }
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an auction.
    AuctionId,
    "auction"
);

uuid_id!(
    /// Unique identifier for a bid on an auction.
    BidId,
    "bid"
);

uuid_id!(
    /// Unique identifier for a payment order. This is the identifier a buyer
    /// sees in order-related direct messages, so it has no display prefix.
    OrderId,
    ""
);

uuid_id!(
    /// Unique identifier for a fixed-price listing.
    ListingId,
    "listing"
);

uuid_id!(
    /// Unique identifier for a seller (merchant stall owner).
    SellerId,
    "seller"
);

// ---------------------------------------------------------------------------
// IdentityKey
// ---------------------------------------------------------------------------

/// Public identity of a buyer or bidder on the relay network.
/// This is the raw ed25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct IdentityKey(pub [u8; 32]);

impl IdentityKey {
    #[must_use]
    pub fn from_pubkey(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a 64-character hex public key.
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        let raw = hex::decode(s).ok()?;
        let bytes: [u8; 32] = raw.try_into().ok()?;
        Some(Self(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// TxId
// ---------------------------------------------------------------------------

/// A ledger transaction id, as reported by the chain index (hex string).
/// Opaque to the engine: it is only ever compared and logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub String);

impl TxId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EventId
// ---------------------------------------------------------------------------

/// A relay event id (hex-encoded SHA-256 of the canonical event form).
/// Minted when an event is signed; used as correlation token on orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auction_id_uniqueness() {
        let a = AuctionId::new();
        let b = AuctionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn order_id_ordering() {
        let a = OrderId::new();
        let b = OrderId::new();
        assert!(a < b);
    }

    #[test]
    fn order_id_display_has_no_prefix() {
        let id = OrderId::new();
        assert_eq!(format!("{id}"), id.0.to_string());
    }

    #[test]
    fn auction_id_display_prefixed() {
        let id = AuctionId::new();
        assert!(format!("{id}").starts_with("auction:"));
    }

    #[test]
    fn identity_key_hex_roundtrip() {
        let key = IdentityKey::from_pubkey([7u8; 32]);
        let parsed = IdentityKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key, parsed);
    }

    #[test]
    fn identity_key_rejects_bad_hex() {
        assert!(IdentityKey::from_hex("zz").is_none());
        assert!(IdentityKey::from_hex("abcd").is_none());
    }

    #[test]
    fn serde_roundtrips() {
        let oid = OrderId::new();
        let json = serde_json::to_string(&oid).unwrap();
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(oid, back);

        let key = IdentityKey::from_pubkey([9u8; 32]);
        let json = serde_json::to_string(&key).unwrap();
        let back: IdentityKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }
}
