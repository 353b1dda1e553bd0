//! System-wide constants: relay event kinds, polling cadences, defaults.

use std::time::Duration;

/// Kind of an encrypted direct-message event.
pub const DM_EVENT_KIND: u16 = 4;
/// Kind of a deletion event (referencing a prior event in its `e` tag).
pub const DELETE_EVENT_KIND: u16 = 5;
/// Kind of a bid-status event (winner / accepted announcements).
pub const BID_STATUS_EVENT_KIND: u16 = 1022;
/// Kind of the replaceable stall (merchant profile) event.
pub const STALL_EVENT_KIND: u16 = 30017;
/// Kind of the replaceable product event a listing is published as.
pub const PRODUCT_EVENT_KIND: u16 = 30018;

/// Delay between finalizer sweeps in production cadence.
pub const FINALIZE_INTERVAL_PROD: Duration = Duration::from_secs(5);
/// Delay between finalizer sweeps in test cadence.
pub const FINALIZE_INTERVAL_TEST: Duration = Duration::from_secs(1);
/// Delay between settlement passes in production cadence.
pub const SETTLE_INTERVAL_PROD: Duration = Duration::from_secs(10);
/// Delay between settlement passes in test cadence.
pub const SETTLE_INTERVAL_TEST: Duration = Duration::from_secs(1);
/// Nap taken when the chain index reports unavailable (production).
pub const LEDGER_COOLDOWN_PROD: Duration = Duration::from_secs(60);
/// Nap taken when the chain index reports unavailable (test).
pub const LEDGER_COOLDOWN_TEST: Duration = Duration::from_secs(1);

/// Default payment window for a newly opened order.
pub const DEFAULT_ORDER_TIMEOUT_MINUTES: i64 = 1440;
/// Anti-sniping window: auctions ending within this window are pushed out
/// when a gated bid unlocks.
pub const AUCTION_EXTENSION_WINDOW_SECS: i64 = 300;

/// Prefix of decommissioned placeholder addresses from before on-chain
/// payments existed; the ledger client returns no transactions for them
/// without a network round-trip.
pub const PLACEHOLDER_ADDRESS_PREFIX: &str = "OLD_";
