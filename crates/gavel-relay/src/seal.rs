//! Direct-message sealing.
//!
//! DM bodies are sealed with AES-256-GCM under a per-conversation key
//! derived from the sender secret and the recipient identity. The sealed
//! payload travels as `base64(ciphertext)?iv=base64(nonce)` in the content
//! of a kind-4 event.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::SigningKey;
use sha2::{Digest, Sha256};

use gavel_types::{IdentityKey, MarketError, Result};

const KEY_CONTEXT: &[u8] = b"gavel-dm-v1";

/// Symmetric conversation key for a (sender, recipient) pair.
#[must_use]
pub fn conversation_key(sender: &SigningKey, recipient: &IdentityKey) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(KEY_CONTEXT);
    hasher.update(sender.to_bytes());
    hasher.update(recipient.as_bytes());
    hasher.finalize().into()
}

fn invalid(reason: impl Into<String>) -> MarketError {
    MarketError::InvalidEvent {
        reason: reason.into(),
    }
}

/// Seal a plaintext body for the recipient.
pub fn seal_dm(sender: &SigningKey, recipient: &IdentityKey, plaintext: &str) -> Result<String> {
    let key = conversation_key(sender, recipient);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let nonce_bytes: [u8; 12] = rand::random();
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|e| invalid(format!("seal: {e}")))?;
    Ok(format!(
        "{}?iv={}",
        BASE64.encode(ciphertext),
        BASE64.encode(nonce_bytes)
    ))
}

/// Open a sealed body with the conversation key. Used by tests and tooling;
/// buyers' clients do the same on their side of the conversation.
pub fn unseal_dm(sender: &SigningKey, recipient: &IdentityKey, sealed: &str) -> Result<String> {
    let (cipher_b64, nonce_b64) = sealed
        .split_once("?iv=")
        .ok_or_else(|| invalid("missing iv separator"))?;
    let ciphertext = BASE64
        .decode(cipher_b64)
        .map_err(|e| invalid(format!("ciphertext base64: {e}")))?;
    let nonce_bytes = BASE64
        .decode(nonce_b64)
        .map_err(|e| invalid(format!("nonce base64: {e}")))?;
    if nonce_bytes.len() != 12 {
        return Err(invalid("nonce length"));
    }

    let key = conversation_key(sender, recipient);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
        .map_err(|e| invalid(format!("unseal: {e}")))?;
    String::from_utf8(plaintext).map_err(|e| invalid(format!("utf8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    #[test]
    fn seal_unseal_roundtrip() {
        let recipient = IdentityKey::from_pubkey([9u8; 32]);
        let sealed = seal_dm(&sender(), &recipient, r#"{"id":"x","type":2}"#).unwrap();
        assert!(sealed.contains("?iv="));
        let opened = unseal_dm(&sender(), &recipient, &sealed).unwrap();
        assert_eq!(opened, r#"{"id":"x","type":2}"#);
    }

    #[test]
    fn distinct_nonces_per_seal() {
        let recipient = IdentityKey::from_pubkey([9u8; 32]);
        let a = seal_dm(&sender(), &recipient, "same body").unwrap();
        let b = seal_dm(&sender(), &recipient, "same body").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_recipient_cannot_open() {
        let recipient = IdentityKey::from_pubkey([9u8; 32]);
        let other = IdentityKey::from_pubkey([10u8; 32]);
        let sealed = seal_dm(&sender(), &recipient, "secret").unwrap();
        assert!(unseal_dm(&sender(), &other, &sealed).is_err());
    }

    #[test]
    fn malformed_payload_rejected() {
        let recipient = IdentityKey::from_pubkey([9u8; 32]);
        assert!(unseal_dm(&sender(), &recipient, "no-separator").is_err());
        assert!(unseal_dm(&sender(), &recipient, "AAAA?iv=bad!").is_err());
    }
}
