//! Seller (merchant) identity and payout configuration.

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

use crate::{IdentityKey, SellerId};

/// A merchant whose items the engine settles payments for.
///
/// The engine needs three things from a seller: the relay signing key that
/// authenticates outgoing events and direct messages, the wallet handle used
/// to derive fresh payout addresses (absent for sellers without on-chain
/// payouts), and an optional Lightning-style static address forwarded to
/// buyers as an alternative payment route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    /// Raw ed25519 secret the seller publishes relay events with.
    pub relay_secret: [u8; 32],
    /// Opaque wallet account handle understood by the address provider.
    pub wallet: Option<String>,
    pub lightning_address: Option<String>,
}

impl Seller {
    /// Parse the relay signing key. The raw bytes live in the store; the key
    /// object is reconstructed whenever an event needs signing.
    #[must_use]
    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.relay_secret)
    }

    /// Public identity the seller is known by on the relay network.
    #[must_use]
    pub fn public_key(&self) -> IdentityKey {
        IdentityKey(self.signing_key().verifying_key().to_bytes())
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Seller {
    pub fn dummy(secret: [u8; 32]) -> Self {
        Self {
            id: SellerId::new(),
            relay_secret: secret,
            wallet: Some("acct-0".to_string()),
            lightning_address: None,
        }
    }

    /// A seller with no wallet configured; orders opened for them carry no
    /// on-chain address.
    pub fn dummy_walletless(secret: [u8; 32]) -> Self {
        Self {
            id: SellerId::new(),
            relay_secret: secret,
            wallet: None,
            lightning_address: None,
        }
    }
}
