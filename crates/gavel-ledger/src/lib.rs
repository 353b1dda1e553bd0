//! # gavel-ledger
//!
//! Chain-facing service clients consumed by the settlement engine:
//!
//! - [`LedgerQuery`] — "given an address, what funding transactions does the
//!   chain index know about?" — with the production Esplora-API
//!   implementation ([`EsploraLedger`]) and a deterministic in-memory mock
//!   ([`MockLedger`]).
//! - [`AddressProvider`] — "give me a fresh payout address for this seller"
//!   — with an HTTP wallet-daemon implementation ([`HttpWallet`]) and a
//!   deterministic mock ([`MockWallet`]).
//!
//! Both traits are injected into the engine as `Arc<dyn ...>` once at
//! process startup; business logic never branches on mock vs. real.
//! Transient failures surface as the distinguished
//! [`MarketError::LedgerUnavailable`] / [`MarketError::AddressGeneration`]
//! conditions and are retried on a later polling pass.
//!
//! [`MarketError::LedgerUnavailable`]: gavel_types::MarketError::LedgerUnavailable
//! [`MarketError::AddressGeneration`]: gavel_types::MarketError::AddressGeneration

pub mod client;
pub mod esplora;
pub mod mock;
pub mod wallet;

pub use client::{FundingTx, LedgerQuery};
pub use esplora::EsploraLedger;
pub use mock::MockLedger;
pub use wallet::{AddressProvider, HttpWallet, MockWallet};
