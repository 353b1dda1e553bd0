//! Esplora-API ledger client (mempool.space and compatible indexes).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use gavel_types::{constants::PLACEHOLDER_ADDRESS_PREFIX, MarketError, Result, Sats, TxId};

use crate::client::{FundingTx, LedgerQuery};

/// Wire shape of `GET {base}/api/address/{addr}/txs`.
#[derive(Debug, Deserialize)]
struct AddressTx {
    txid: String,
    vout: Vec<TxOut>,
    status: TxStatus,
}

#[derive(Debug, Deserialize)]
struct TxOut {
    #[serde(default)]
    scriptpubkey_address: Option<String>,
    value: Sats,
}

#[derive(Debug, Deserialize)]
struct TxStatus {
    confirmed: bool,
    #[serde(default)]
    block_time: Option<i64>,
}

/// Production ledger client against an Esplora-compatible chain index.
pub struct EsploraLedger {
    base_url: String,
    http: reqwest::Client,
}

impl EsploraLedger {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MarketError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn unavailable(err: impl std::fmt::Display) -> MarketError {
        MarketError::LedgerUnavailable {
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl LedgerQuery for EsploraLedger {
    async fn funding_txs(&self, address: &str) -> Result<Vec<FundingTx>> {
        // Placeholder addresses predate on-chain settlement; nothing to scan.
        if address.starts_with(PLACEHOLDER_ADDRESS_PREFIX) {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/address/{address}/txs", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(Self::unavailable)?;
        if !response.status().is_success() {
            return Err(MarketError::LedgerUnavailable {
                reason: format!("index returned {} for {url}", response.status()),
            });
        }
        let raw: Vec<AddressTx> = response.json().await.map_err(Self::unavailable)?;

        let mut txs = Vec::with_capacity(raw.len());
        for tx in raw {
            let outputs: Vec<&TxOut> = tx
                .vout
                .iter()
                .filter(|vo| vo.scriptpubkey_address.as_deref() == Some(address))
                .collect();
            if outputs.len() > 1 {
                warn!(txid = %tx.txid, %address, "multiple outputs for same address");
            }
            let value = outputs.iter().map(|vo| vo.value).sum();
            let block_time = if tx.status.confirmed {
                tx.status
                    .block_time
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
            } else {
                None
            };
            txs.push(FundingTx {
                txid: TxId::new(tx.txid),
                value,
                confirmed: tx.status.confirmed,
                block_time,
            });
        }
        Ok(txs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_address_tx_shape() {
        let raw = r#"[{
            "txid": "deadbeef",
            "vout": [
                {"scriptpubkey_address": "tb1qwatched", "value": 30000},
                {"scriptpubkey_address": "tb1qchange", "value": 12345}
            ],
            "status": {"confirmed": true, "block_time": 1700000000}
        }]"#;
        let txs: Vec<AddressTx> = serde_json::from_str(raw).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].txid, "deadbeef");
        assert!(txs[0].status.confirmed);
        assert_eq!(txs[0].vout[0].value, 30_000);
    }

    #[test]
    fn unconfirmed_status_has_no_block_time() {
        let raw = r#"{"confirmed": false}"#;
        let status: TxStatus = serde_json::from_str(raw).unwrap();
        assert!(!status.confirmed);
        assert!(status.block_time.is_none());
    }

    #[tokio::test]
    async fn placeholder_address_short_circuits() {
        // Points at a closed port: would error if a request were made.
        let ledger = EsploraLedger::new("http://127.0.0.1:1").unwrap();
        let txs = ledger.funding_txs("OLD_legacy-sale-17").await.unwrap();
        assert!(txs.is_empty());
    }
}
