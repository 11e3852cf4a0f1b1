use anyhow::Result;
use ethers::types::U256;
use tracing::{debug, error, warn};

use super::fixed_point::{scale_price, SENTINEL_PRICE};
use super::request::OracleRequest;
use super::{PriceSource, PriceWriter};

/// Per-request relay state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Fetch attempt `n` (zero-based) is about to run
    Attempting(u32),
    /// A real price was fetched and handed to the writeback adapter
    Submitted,
    /// Every attempt failed and the sentinel price was handed to the writeback adapter
    FallbackSubmitted,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Submitted | RequestState::FallbackSubmitted)
    }
}

/// Result of relaying one request
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub request: OracleRequest,
    /// Terminal state reached
    pub state: RequestState,
    /// Fetch attempts made, successful one included
    pub attempts: u32,
    pub failed_attempts: u32,
    /// Fixed-point value handed to the writeback adapter (zero for the sentinel)
    pub submitted_value: U256,
    /// Set when the writeback itself failed; the request is not retried
    pub writeback_error: Option<String>,
}

/// Running counters over every processed request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub processed: u64,
    pub submitted: u64,
    pub fallback: u64,
    pub fetch_failures: u64,
    pub writeback_failures: u64,
}

/// Drives a request from its first fetch attempt to a terminal state.
///
/// Failed fetches are retried immediately, with no backoff, up to
/// `max_retries` attempts in total. When they are exhausted the sentinel price
/// is submitted instead so the caller learns the price is unavailable.
/// Writeback failures are logged and counted but never retried.
pub struct RetryEngine<P, W> {
    price_source: P,
    writer: W,
    max_retries: u32,
    stats: RelayStats,
}

impl<P: PriceSource, W: PriceWriter> RetryEngine<P, W> {
    pub fn new(price_source: P, writer: W, max_retries: u32) -> Self {
        Self {
            price_source,
            writer,
            max_retries: max_retries.max(1),
            stats: RelayStats::default(),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Relay a single request until it reaches a terminal state
    pub async fn process(&mut self, request: OracleRequest) -> RequestOutcome {
        let mut state = RequestState::Attempting(0);
        let mut failed_attempts = 0;
        let mut submitted_value = U256::zero();
        let mut writeback_error = None;

        while let RequestState::Attempting(attempt) = state {
            state = match self.fetch_scaled_price().await {
                Ok(price) => {
                    submitted_value = price;
                    writeback_error = self.write_back(&request, price).await;
                    RequestState::Submitted
                }
                Err(e) if attempt + 1 >= self.max_retries => {
                    failed_attempts += 1;
                    self.stats.fetch_failures += 1;
                    warn!(
                        "[RETRY] Request {} failed {} attempt(s), last error: {:#}. Submitting sentinel price",
                        request, failed_attempts, e
                    );
                    submitted_value = scale_price(SENTINEL_PRICE).unwrap_or_default();
                    writeback_error = self.write_back(&request, submitted_value).await;
                    RequestState::FallbackSubmitted
                }
                Err(e) => {
                    failed_attempts += 1;
                    self.stats.fetch_failures += 1;
                    debug!(
                        "[RETRY] Request {} attempt {}/{} failed: {:#}",
                        request,
                        attempt + 1,
                        self.max_retries,
                        e
                    );
                    RequestState::Attempting(attempt + 1)
                }
            };
        }

        self.stats.processed += 1;
        match state {
            RequestState::Submitted => self.stats.submitted += 1,
            _ => self.stats.fallback += 1,
        }

        let attempts = match state {
            RequestState::Submitted => failed_attempts + 1,
            _ => failed_attempts,
        };

        RequestOutcome {
            request,
            state,
            attempts,
            failed_attempts,
            submitted_value,
            writeback_error,
        }
    }

    async fn fetch_scaled_price(&self) -> Result<U256> {
        let price = self.price_source.fetch_price().await?;
        scale_price(&price)
    }

    async fn write_back(&mut self, request: &OracleRequest, price: U256) -> Option<String> {
        match self
            .writer
            .set_latest_price(request.caller_address, price, request.id)
            .await
        {
            Ok(()) => None,
            Err(e) => {
                self.stats.writeback_failures += 1;
                error!(
                    "[WRITEBACK] setLatestEthPrice failed for request {} (price {}): {:#}",
                    request, price, e
                );
                Some(format!("{:#}", e))
            }
        }
    }
}
