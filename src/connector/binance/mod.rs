mod client;
mod types;

pub use client::{BinanceConfig, BinancePriceClient};
pub use types::{ApiError, TickerPrice};
