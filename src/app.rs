use anyhow::{Context, Result};
use colored::Colorize;
use ethers::types::Address;
use tokio::signal;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::connector::binance::{BinanceConfig, BinancePriceClient};
use crate::connector::oracle::{self, OracleContract, OracleWriter};
use crate::relay::RetryEngine;
use crate::services::{BatchScheduler, EventIngestService};

// Macro for timestamped colored output
macro_rules! tprintln {
    ($($arg:tt)*) => {{
        println!("{} {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string().bright_black(),
            format!($($arg)*)
        );
    }};
}

/// OracleRelay - Main application structure that owns every relay component
pub struct OracleRelay {
    pub config: Config,
    pub owner_address: Address,
    pub chain_id: u64,

    // Oracle contract bound to the signing provider
    pub contract: OracleContract,

    // Price feed client
    pub price_client: BinancePriceClient,
}

impl OracleRelay {
    /// Create and initialize a new OracleRelay instance
    ///
    /// This performs all the wiring:
    /// - Loads config (config.json, .env, environment) and validates it
    /// - Loads the signing key and connects to the node
    /// - Resolves the oracle contract address
    /// - Creates the price feed client
    ///
    /// Any failure here is fatal: the relay never starts half-configured.
    pub async fn new() -> Result<Self> {
        tprintln!("{}", "═══════════════════════════════════════════════════".bright_cyan().bold());
        tprintln!("{}", "  ETH Price Oracle - Request Relay".bright_cyan().bold());
        tprintln!("{}", "═══════════════════════════════════════════════════".bright_cyan().bold());
        tprintln!("");

        // Load configuration
        let config = Config::load().context("Failed to load configuration")?;
        config.validate().context("Invalid configuration")?;

        tprintln!("{} Price Feed: {}", "[CONFIG]".blue().bold(),
            format!("{} @ {}", config.price_symbol, config.price_api_url).bright_white().bold()
        );
        tprintln!("{} Poll Interval: {}", "[CONFIG]".blue().bold(),
            format!("{} ms", config.poll_interval_ms).bright_white()
        );
        tprintln!("{} Chunk Size: {}", "[CONFIG]".blue().bold(),
            config.chunk_size.to_string().bright_white()
        );
        tprintln!("{} Max Retries: {}", "[CONFIG]".blue().bold(),
            config.max_retries.to_string().bright_white()
        );
        tprintln!("{} Node: {}", "[CONFIG]".blue().bold(), config.rpc_url.bright_white());
        tprintln!("");

        // Account, node connection and contract binding
        let connection = oracle::connect(
            &config.rpc_url,
            &config.private_key_file,
            config.oracle_address.as_deref(),
            &config.oracle_artifact,
        )
        .await
        .context("Failed to initialize oracle account and contract")?;

        tprintln!("{} {} Connected to chain {} as {}",
            "[INIT]".cyan().bold(),
            "✓".green().bold(),
            connection.chain_id,
            format!("{:?}", connection.owner_address).bright_white()
        );
        tprintln!("{} Oracle contract: {}",
            "[INIT]".cyan().bold(),
            format!("{:?}", connection.contract.address()).bright_white()
        );

        let price_client = BinancePriceClient::new(BinanceConfig {
            rest_url: config.price_api_url.clone(),
            symbol: config.price_symbol.clone(),
            timeout: config.fetch_timeout(),
        })
        .context("Failed to create price feed client")?;

        Ok(Self {
            config,
            owner_address: connection.owner_address,
            chain_id: connection.chain_id,
            contract: connection.contract,
            price_client,
        })
    }

    /// Run the relay until SIGINT/SIGTERM or until the event subscription dies
    pub async fn run(self) -> Result<()> {
        let OracleRelay {
            config,
            owner_address,
            contract,
            price_client,
            ..
        } = self;

        // Ingestion -> scheduler channel
        let (request_tx, request_rx) = mpsc::unbounded_channel();

        let ingest_service = EventIngestService {
            contract: contract.clone(),
            request_tx,
        };
        let mut ingest_handle = tokio::spawn(async move { ingest_service.run().await });

        let writer = OracleWriter::new(contract.clone(), owner_address);
        let engine = RetryEngine::new(price_client, writer, config.max_retries);
        let scheduler = BatchScheduler::new(
            request_rx,
            engine,
            config.chunk_size,
            config.poll_interval(),
        )
        .with_submission_log(config.submission_log.clone());

        // Helper async function to wait for SIGTERM
        async fn wait_for_sigterm() {
            #[cfg(unix)]
            {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        tracing::warn!("[MAIN] Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }

            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        }

        let mut ingest_failure: Option<String> = None;
        let shutdown = async {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    tprintln!("{} {} Received SIGINT (Ctrl+C), shutting down the oracle client...",
                        "[MAIN]".bright_white().bold(),
                        "⚠".yellow().bold()
                    );
                }

                _ = wait_for_sigterm() => {
                    tprintln!("{} {} Received SIGTERM, shutting down the oracle client...",
                        "[MAIN]".bright_white().bold(),
                        "⚠".yellow().bold()
                    );
                }

                result = &mut ingest_handle => {
                    let reason = match result {
                        Ok(Ok(())) => "event subscription finished".to_string(),
                        Ok(Err(e)) => format!("{:#}", e),
                        Err(e) => format!("ingest task failed: {}", e),
                    };
                    tprintln!("{} {} Event ingestion stopped: {}",
                        "[MAIN]".bright_white().bold(),
                        "✗".red().bold(),
                        reason.red()
                    );
                    ingest_failure = Some(reason);
                }
            }
        };

        tprintln!("{} Relaying price requests every {} ms (up to {} per tick)",
            "[MAIN]".bright_white().bold(),
            config.poll_interval_ms,
            config.chunk_size
        );

        let report = scheduler.run(shutdown).await;

        // ═══════════════════════════════════════════════════
        // SHUTDOWN
        // ═══════════════════════════════════════════════════

        ingest_handle.abort();
        // Dropping the last contract handle closes the websocket connection
        drop(contract);

        tprintln!("");
        tprintln!("{} Relayed {} request(s): {} submitted, {} fallback, {} fetch failure(s), {} writeback failure(s)",
            "[SHUTDOWN]".yellow().bold(),
            report.stats.processed,
            report.stats.submitted,
            report.stats.fallback,
            report.stats.fetch_failures,
            report.stats.writeback_failures
        );
        if report.pending > 0 {
            tprintln!("{} {} {} pending request(s) dropped",
                "[SHUTDOWN]".yellow().bold(),
                "⚠".yellow().bold(),
                report.pending
            );
        }

        match ingest_failure {
            Some(reason) => anyhow::bail!("Oracle relay stopped: {}", reason),
            None => Ok(()),
        }
    }
}
