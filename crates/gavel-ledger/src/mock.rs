//! Deterministic offline ledger for tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use gavel_types::{MarketError, Result};

use crate::client::{FundingTx, LedgerQuery};

/// In-memory ledger: transactions are seeded per address, and the whole
/// index can be switched into an "unavailable" mode to exercise the
/// settlement loop's cooldown path.
#[derive(Default)]
pub struct MockLedger {
    txs: Mutex<HashMap<String, Vec<FundingTx>>>,
    unavailable: AtomicBool,
}

impl MockLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed (replace) the transactions known for an address.
    pub fn seed(&self, address: impl Into<String>, txs: Vec<FundingTx>) {
        self.txs
            .lock()
            .expect("mock ledger lock poisoned")
            .insert(address.into(), txs);
    }

    /// Toggle the transient-failure mode.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerQuery for MockLedger {
    async fn funding_txs(&self, address: &str) -> Result<Vec<FundingTx>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MarketError::LedgerUnavailable {
                reason: "mock ledger switched off".to_string(),
            });
        }
        Ok(self
            .txs
            .lock()
            .expect("mock ledger lock poisoned")
            .get(address)
            .cloned()
            .unwrap_or_default())
    }
}
