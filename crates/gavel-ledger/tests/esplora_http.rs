//! HTTP-level tests for the Esplora ledger client against a mock index.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gavel_ledger::{EsploraLedger, LedgerQuery};
use gavel_types::MarketError;

const ADDRESS: &str = "tb1qwatchedaddress";

#[tokio::test]
async fn sums_outputs_for_watched_address() {
    let server = MockServer::start().await;
    let body = serde_json::json!([
        {
            "txid": "11".repeat(32),
            "vout": [
                {"scriptpubkey_address": ADDRESS, "value": 30_000},
                {"scriptpubkey_address": ADDRESS, "value": 20_000},
                {"scriptpubkey_address": "tb1qchange", "value": 5_000}
            ],
            "status": {"confirmed": true, "block_time": 1_700_000_000}
        },
        {
            "txid": "22".repeat(32),
            "vout": [
                {"scriptpubkey_address": ADDRESS, "value": 1_000}
            ],
            "status": {"confirmed": false}
        }
    ]);
    Mock::given(method("GET"))
        .and(path(format!("/api/address/{ADDRESS}/txs")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let ledger = EsploraLedger::new(server.uri()).unwrap();
    let txs = ledger.funding_txs(ADDRESS).await.unwrap();

    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].value, 50_000);
    assert!(txs[0].confirmed);
    assert!(txs[0].block_time.is_some());
    assert_eq!(txs[1].value, 1_000);
    assert!(!txs[1].confirmed);
    assert!(txs[1].block_time.is_none());
}

#[tokio::test]
async fn server_error_maps_to_ledger_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let ledger = EsploraLedger::new(server.uri()).unwrap();
    let err = ledger.funding_txs(ADDRESS).await.unwrap_err();
    assert!(matches!(err, MarketError::LedgerUnavailable { .. }));
}

#[tokio::test]
async fn garbage_body_maps_to_ledger_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let ledger = EsploraLedger::new(server.uri()).unwrap();
    let err = ledger.funding_txs(ADDRESS).await.unwrap_err();
    assert!(matches!(err, MarketError::LedgerUnavailable { .. }));
}

#[tokio::test]
async fn empty_history_is_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let ledger = EsploraLedger::new(server.uri()).unwrap();
    assert!(ledger.funding_txs(ADDRESS).await.unwrap().is_empty());
}
