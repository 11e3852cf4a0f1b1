/// Request-relay engine: queue, fixed-point conversion and retry state machine

pub mod fixed_point;
pub mod queue;
pub mod request;
pub mod retry;

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, U256};

pub use queue::RequestQueue;
pub use request::{OracleEvent, OracleRequest};
pub use retry::{RelayStats, RequestOutcome, RequestState, RetryEngine};

/// Source of the latest price as a decimal string.
///
/// One remote call per invocation; retry policy belongs to [`RetryEngine`].
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self) -> Result<String>;
}

/// Submits a scaled price back to the oracle contract for one request.
#[async_trait]
pub trait PriceWriter: Send + Sync {
    async fn set_latest_price(&self, caller_address: Address, price: U256, id: U256) -> Result<()>;
}
