//! # gavel-daemon
//!
//! Process bootstrap shared by the two loop binaries: logging, environment
//! configuration, backend selection and graceful termination.
//!
//! Backend selection happens exactly once, here — the loops receive trait
//! objects and never branch on mock vs. real.
//!
//! ## Environment
//!
//! | Variable | Meaning |
//! |---|---|
//! | `GAVEL_ENV` | `test` or `production` cadence (default production) |
//! | `GAVEL_STORE_PATH` | snapshot file backing the store (required) |
//! | `GAVEL_MOCK_LEDGER` | use the in-memory ledger instead of Esplora |
//! | `GAVEL_ESPLORA_URL` | chain index base URL (default mempool.space) |
//! | `GAVEL_MOCK_RELAY` | use the recording relay instead of the sidecar |
//! | `GAVEL_RELAY_URL` | relay sidecar base URL |
//! | `GAVEL_MOCK_WALLET` | use the deterministic wallet |
//! | `GAVEL_WALLET_URL` | wallet daemon base URL |
//! | `GAVEL_UNDERPAYMENT` | `hold` (default) or `expire` |

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gavel_ledger::{AddressProvider, EsploraLedger, HttpWallet, LedgerQuery, MockLedger, MockWallet};
use gavel_relay::{HttpRelay, MockRelay, RelayPublisher};
use gavel_store::MarketStore;
use gavel_types::{EngineConfig, MarketError, Result};

const DEFAULT_ESPLORA_URL: &str = "https://mempool.space";

/// Everything a loop binary needs, constructed once from the environment.
pub struct Services {
    pub store: MarketStore,
    pub ledger: Arc<dyn LedgerQuery>,
    pub relay: Arc<dyn RelayPublisher>,
    pub wallet: Arc<dyn AddressProvider>,
    pub config: EngineConfig,
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| MarketError::Configuration(format!("{name} is required")))
}

/// Resolve configuration and construct the backends.
pub fn services_from_env() -> Result<Services> {
    let config = EngineConfig::from_env()?;

    let store = MarketStore::open(required("GAVEL_STORE_PATH")?)?;

    let ledger: Arc<dyn LedgerQuery> = if env_flag("GAVEL_MOCK_LEDGER") {
        info!("using mock ledger");
        Arc::new(MockLedger::new())
    } else {
        let url = std::env::var("GAVEL_ESPLORA_URL")
            .unwrap_or_else(|_| DEFAULT_ESPLORA_URL.to_string());
        info!(%url, "using Esplora ledger");
        Arc::new(EsploraLedger::new(url)?)
    };

    let relay: Arc<dyn RelayPublisher> = if env_flag("GAVEL_MOCK_RELAY") {
        info!("using mock relay");
        Arc::new(MockRelay::new())
    } else {
        let url = required("GAVEL_RELAY_URL")?;
        info!(%url, "using relay sidecar");
        Arc::new(HttpRelay::new(url)?)
    };

    let wallet: Arc<dyn AddressProvider> = if env_flag("GAVEL_MOCK_WALLET") {
        info!("using mock wallet");
        Arc::new(MockWallet::new())
    } else {
        let url = required("GAVEL_WALLET_URL")?;
        info!(%url, "using wallet daemon");
        Arc::new(HttpWallet::new(url)?)
    };

    Ok(Services {
        store,
        ledger,
        relay,
        wallet,
        config,
    })
}

/// Console logging with `RUST_LOG`-style filtering, `info` by default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// A watch channel that flips on SIGINT or SIGTERM. Loops finish their
/// current pass before exiting; in-flight transactions either commit whole
/// or are dropped whole at the store boundary.
pub fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_termination().await;
        info!("termination signal received, shutting down");
        let _ = tx.send(true);
    });
    rx
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            error!("failed to install SIGTERM handler, falling back to ctrl-c only: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_flag_parsing() {
        // Unset flags are off.
        assert!(!env_flag("GAVEL_TEST_FLAG_THAT_DOES_NOT_EXIST"));
    }

    #[test]
    fn missing_required_var_is_a_config_error() {
        let err = required("GAVEL_TEST_VAR_THAT_DOES_NOT_EXIST").unwrap_err();
        assert!(matches!(err, MarketError::Configuration(_)));
    }
}
