//! Engine configuration.
//!
//! Both loop processes read their configuration from the environment once at
//! startup; business logic only ever sees the resolved [`EngineConfig`].

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};

use crate::{constants, MarketError, Result};

/// Polling cadence: test mode runs tight loops so integration suites finish
/// quickly, production mode is easy on the chain index and the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cadence {
    Test,
    Production,
}

impl Cadence {
    /// Resolve from an environment value (`test` / `production`).
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(MarketError::Configuration(format!(
                "unknown cadence {other:?}, expected \"test\" or \"production\""
            ))),
        }
    }

    #[must_use]
    pub fn finalize_interval(&self) -> Duration {
        match self {
            Self::Test => constants::FINALIZE_INTERVAL_TEST,
            Self::Production => constants::FINALIZE_INTERVAL_PROD,
        }
    }

    #[must_use]
    pub fn settle_interval(&self) -> Duration {
        match self {
            Self::Test => constants::SETTLE_INTERVAL_TEST,
            Self::Production => constants::SETTLE_INTERVAL_PROD,
        }
    }

    #[must_use]
    pub fn ledger_cooldown(&self) -> Duration {
        match self {
            Self::Test => constants::LEDGER_COOLDOWN_TEST,
            Self::Production => constants::LEDGER_COOLDOWN_PROD,
        }
    }
}

/// What the settlement loop does with an order whose address received a
/// transaction below the order total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnderpaymentPolicy {
    /// Log the underpayment and hold the order open for manual follow-up;
    /// the timeout never expires an underpaid order.
    Hold,
    /// Log the underpayment but let the timeout expire the order as if no
    /// transaction had arrived.
    Expire,
}

impl UnderpaymentPolicy {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "hold" => Ok(Self::Hold),
            "expire" => Ok(Self::Expire),
            other => Err(MarketError::Configuration(format!(
                "unknown underpayment policy {other:?}, expected \"hold\" or \"expire\""
            ))),
        }
    }
}

/// Resolved configuration shared by both loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub cadence: Cadence,
    pub underpayment: UnderpaymentPolicy,
    /// Anti-sniping window in seconds (see [`crate::Auction::extension_after`]).
    pub extension_window_secs: i64,
    /// Payment window given to orders the finalizer opens.
    pub order_timeout_minutes: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cadence: Cadence::Production,
            underpayment: UnderpaymentPolicy::Hold,
            extension_window_secs: constants::AUCTION_EXTENSION_WINDOW_SECS,
            order_timeout_minutes: constants::DEFAULT_ORDER_TIMEOUT_MINUTES,
        }
    }
}

impl EngineConfig {
    /// Read `GAVEL_ENV` and `GAVEL_UNDERPAYMENT` from the environment,
    /// falling back to production defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(value) = std::env::var("GAVEL_ENV") {
            config.cadence = Cadence::parse(&value)?;
        }
        if let Ok(value) = std::env::var("GAVEL_UNDERPAYMENT") {
            config.underpayment = UnderpaymentPolicy::parse(&value)?;
        }
        Ok(config)
    }

    #[must_use]
    pub fn extension_window(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.extension_window_secs)
    }

    /// Test-cadence configuration used by integration suites.
    #[must_use]
    pub fn test() -> Self {
        Self {
            cadence: Cadence::Test,
            ..Self::default()
        }
    }
}
