//! Payout address generation.
//!
//! Sellers with a wallet configured get a fresh on-chain address per order;
//! the actual derivation lives in an external wallet daemon. Sellers without
//! a wallet produce orders with no on-chain address, which the settlement
//! loop never scans.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use gavel_types::{MarketError, Result, Seller};

/// Per-seller payout address generation.
#[async_trait]
pub trait AddressProvider: Send + Sync {
    /// Generate a fresh address for the seller's configured wallet.
    ///
    /// # Errors
    /// Returns [`MarketError::AddressGeneration`] when the wallet has no
    /// address to give (daemon down, exhausted keypool, missing account);
    /// the finalizer logs and skips the auction for the pass.
    async fn next_address(&self, seller: &Seller) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct AddressResponse {
    address: String,
}

/// HTTP client for a wallet daemon exposing
/// `POST {base}/wallets/{account}/addresses -> {"address": ...}`.
pub struct HttpWallet {
    base_url: String,
    http: reqwest::Client,
}

impl HttpWallet {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| MarketError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn failed(err: impl std::fmt::Display) -> MarketError {
        MarketError::AddressGeneration {
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl AddressProvider for HttpWallet {
    async fn next_address(&self, seller: &Seller) -> Result<String> {
        let account = seller
            .wallet
            .as_deref()
            .ok_or_else(|| Self::failed(format!("seller {} has no wallet", seller.id)))?;
        let url = format!("{}/wallets/{account}/addresses", self.base_url);
        let response = self.http.post(&url).send().await.map_err(Self::failed)?;
        if !response.status().is_success() {
            return Err(Self::failed(format!(
                "wallet daemon returned {} for {url}",
                response.status()
            )));
        }
        let body: AddressResponse = response.json().await.map_err(Self::failed)?;
        Ok(body.address)
    }
}

/// Deterministic address source for tests: `mock1q<account>-<n>`, with a
/// switchable failure mode.
#[derive(Default)]
pub struct MockWallet {
    counter: AtomicU64,
    fail: AtomicBool,
}

impl MockWallet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl AddressProvider for MockWallet {
    async fn next_address(&self, seller: &Seller) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MarketError::AddressGeneration {
                reason: "mock wallet switched off".to_string(),
            });
        }
        let account = seller
            .wallet
            .as_deref()
            .ok_or_else(|| MarketError::AddressGeneration {
                reason: format!("seller {} has no wallet", seller.id),
            })?;
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(format!("mock1q{account}-{n}"))
    }
}
