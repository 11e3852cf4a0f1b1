use anyhow::Result;

use eth_price_oracle::OracleRelay;

/// ETH Price Oracle relay
///
/// 1. Listens for GetLatestEthPriceEvent on the oracle contract
/// 2. Queues each request in memory
/// 3. Every tick, relays a bounded chunk of requests: fetch the Binance
///    ETHUSDT price (immediate retries), scale it to 18 decimals and call
///    setLatestEthPrice, or submit 0 once the retries are exhausted
/// 4. Exits on SIGINT/SIGTERM, dropping whatever is still queued
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let relay = OracleRelay::new().await?;
    relay.run().await
}
