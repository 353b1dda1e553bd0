//! The funding-transaction lookup interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gavel_types::{Result, Sats, TxId};

/// A transaction observed paying into a watched address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingTx {
    pub txid: TxId,
    /// Total value paid to the watched address across the transaction's
    /// outputs.
    pub value: Sats,
    pub confirmed: bool,
    pub block_time: Option<DateTime<Utc>>,
}

/// Lookup of funding transactions against an external, eventually-consistent
/// chain index.
///
/// Implementations return every transaction currently known for the address,
/// confirmed or not, and an empty list for decommissioned placeholder
/// addresses. A transient index failure is reported as
/// [`MarketError::LedgerUnavailable`]; the settlement loop naps and retries.
///
/// [`MarketError::LedgerUnavailable`]: gavel_types::MarketError::LedgerUnavailable
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    async fn funding_txs(&self, address: &str) -> Result<Vec<FundingTx>>;
}
