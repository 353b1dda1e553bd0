//! Long-running auction finalizer process.
//!
//! ```sh
//! GAVEL_STORE_PATH=/var/lib/gavel/market.json \
//! GAVEL_RELAY_URL=http://localhost:8100 \
//! GAVEL_WALLET_URL=http://localhost:8200 \
//! finalize-auctions
//! ```

use gavel_daemon::{init_tracing, services_from_env, shutdown_signal};
use gavel_engine::AuctionFinalizer;
use gavel_types::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let services = services_from_env()?;
    info!(cadence = ?services.config.cadence, "starting finalize-auctions");

    let finalizer = AuctionFinalizer::new(
        services.store,
        services.relay,
        services.wallet,
        services.config,
    );
    finalizer.run(shutdown_signal()).await;
    Ok(())
}
