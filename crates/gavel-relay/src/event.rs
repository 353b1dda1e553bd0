//! Signed relay events.

use chrono::Utc;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use gavel_types::{EventId, MarketError, Result};

/// A signed event as the relay sidecar accepts it.
///
/// The id commits to every field except the signature: it is the SHA-256 of
/// the canonical JSON array `[0, pubkey, created_at, kind, tags, content]`,
/// hex-encoded. The signature is ed25519 over the raw id bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayEvent {
    pub id: EventId,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

impl RelayEvent {
    /// Build and sign an event with the current timestamp.
    pub fn sign(
        key: &SigningKey,
        kind: u16,
        tags: Vec<Vec<String>>,
        content: String,
    ) -> Result<Self> {
        Self::sign_at(key, kind, tags, content, Utc::now().timestamp())
    }

    /// Build and sign an event with an explicit timestamp (deterministic,
    /// used by tests).
    pub fn sign_at(
        key: &SigningKey,
        kind: u16,
        tags: Vec<Vec<String>>,
        content: String,
        created_at: i64,
    ) -> Result<Self> {
        let pubkey = hex::encode(key.verifying_key().to_bytes());
        let canonical = serde_json::to_string(&(0u8, &pubkey, created_at, kind, &tags, &content))
            .map_err(|e| MarketError::InvalidEvent {
                reason: format!("canonicalize: {e}"),
            })?;
        let id_bytes: [u8; 32] = Sha256::digest(canonical.as_bytes()).into();
        let sig = key.sign(&id_bytes);
        Ok(Self {
            id: EventId::new(hex::encode(id_bytes)),
            pubkey,
            created_at,
            kind,
            tags,
            content,
            sig: hex::encode(sig.to_bytes()),
        })
    }

    /// Verify the signature against the event's own id and pubkey.
    pub fn verify(&self) -> Result<()> {
        let bad = |reason: String| MarketError::InvalidEvent { reason };
        let pubkey_raw: [u8; 32] = hex::decode(&self.pubkey)
            .map_err(|e| bad(format!("pubkey hex: {e}")))?
            .try_into()
            .map_err(|_| bad("pubkey length".to_string()))?;
        let key = VerifyingKey::from_bytes(&pubkey_raw)
            .map_err(|e| bad(format!("pubkey: {e}")))?;
        let sig_raw: [u8; 64] = hex::decode(&self.sig)
            .map_err(|e| bad(format!("sig hex: {e}")))?
            .try_into()
            .map_err(|_| bad("sig length".to_string()))?;
        let id_bytes = hex::decode(self.id.as_str()).map_err(|e| bad(format!("id hex: {e}")))?;
        key.verify(&id_bytes, &Signature::from_bytes(&sig_raw))
            .map_err(|e| bad(format!("signature: {e}")))
    }

    /// First value of the named tag, if present.
    #[must_use]
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.first().is_some_and(|n| n == name))
            .and_then(|t| t.get(1))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SigningKey {
        SigningKey::from_bytes(&[42u8; 32])
    }

    #[test]
    fn signing_is_deterministic_for_fixed_inputs() {
        let a = RelayEvent::sign_at(&key(), 1022, vec![], "{}".to_string(), 1_700_000_000).unwrap();
        let b = RelayEvent::sign_at(&key(), 1022, vec![], "{}".to_string(), 1_700_000_000).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.sig, b.sig);
    }

    #[test]
    fn id_commits_to_content() {
        let a = RelayEvent::sign_at(&key(), 4, vec![], "one".to_string(), 0).unwrap();
        let b = RelayEvent::sign_at(&key(), 4, vec![], "two".to_string(), 0).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn signature_verifies_and_tamper_fails() {
        let mut event = RelayEvent::sign(
            &key(),
            4,
            vec![vec!["p".to_string(), "ab".repeat(32)]],
            "hello".to_string(),
        )
        .unwrap();
        event.verify().unwrap();

        event.id = EventId::new("00".repeat(32));
        assert!(event.verify().is_err());
    }

    #[test]
    fn tag_lookup() {
        let event = RelayEvent::sign(
            &key(),
            1022,
            vec![
                vec!["e".to_string(), "aa".repeat(32)],
                vec!["p".to_string(), "bb".repeat(32)],
            ],
            String::new(),
        )
        .unwrap();
        assert_eq!(event.tag_value("e"), Some("aa".repeat(32).as_str()));
        assert_eq!(event.tag_value("p"), Some("bb".repeat(32).as_str()));
        assert_eq!(event.tag_value("d"), None);
    }
}
