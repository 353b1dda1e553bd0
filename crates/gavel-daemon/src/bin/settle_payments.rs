//! Long-running payment settlement process.
//!
//! ```sh
//! GAVEL_STORE_PATH=/var/lib/gavel/market.json \
//! GAVEL_RELAY_URL=http://localhost:8100 \
//! settle-payments
//! ```

use gavel_daemon::{init_tracing, services_from_env, shutdown_signal};
use gavel_engine::PaymentSettler;
use gavel_types::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let services = services_from_env()?;
    info!(cadence = ?services.config.cadence, "starting settle-payments");

    let settler = PaymentSettler::new(
        services.store,
        services.ledger,
        services.relay,
        services.config,
    );
    settler.run(shutdown_signal()).await;
    Ok(())
}
