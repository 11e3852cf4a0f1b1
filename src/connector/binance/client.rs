use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

use super::types::{ApiError, TickerPrice};
use crate::relay::PriceSource;

const MAINNET_REST_URL: &str = "https://api.binance.com";
const TICKER_PRICE_PATH: &str = "/api/v3/ticker/price";

/// Configuration for the Binance price client
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub rest_url: String,
    pub symbol: String,
    pub timeout: Duration,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            rest_url: MAINNET_REST_URL.to_string(),
            symbol: "ETHUSDT".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Reads the latest price of a single trading pair from the Binance REST API
pub struct BinancePriceClient {
    config: BinanceConfig,
    client: reqwest::Client,
}

impl BinancePriceClient {
    pub fn new(config: BinanceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { config, client })
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    /// Fetch the latest price as a decimal string
    ///
    /// One request, no retry. Transport errors, non-2xx statuses and
    /// malformed bodies all surface as errors.
    pub async fn get_latest_price(&self) -> Result<String> {
        let url = format!(
            "{}{}",
            self.config.rest_url.trim_end_matches('/'),
            TICKER_PRICE_PATH
        );

        debug!("[BINANCE] Fetching {} price: {}", self.config.symbol, url);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", self.config.symbol.as_str())])
            .send()
            .await
            .context("Price request failed")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read price response")?;

        parse_ticker_response(status, &body, &self.config.symbol)
    }
}

#[async_trait]
impl PriceSource for BinancePriceClient {
    async fn fetch_price(&self) -> Result<String> {
        self.get_latest_price().await
    }
}

/// Validate a ticker response and extract its price
pub fn parse_ticker_response(status: StatusCode, body: &str, symbol: &str) -> Result<String> {
    if !status.is_success() {
        match serde_json::from_str::<ApiError>(body) {
            Ok(err) => bail!("Price request failed: {} - {} (code {})", status, err.msg, err.code),
            Err(_) => bail!("Price request failed: {} - {}", status, body),
        }
    }

    let ticker: TickerPrice = serde_json::from_str(body)
        .with_context(|| format!("Failed to parse price response: {}", body))?;

    if ticker.symbol != symbol {
        bail!("Price response for {} while {} was requested", ticker.symbol, symbol);
    }

    if !is_decimal(&ticker.price) {
        bail!("Malformed price in response: {:?}", ticker.price);
    }

    Ok(ticker.price)
}

fn is_decimal(value: &str) -> bool {
    let mut parts = value.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next();

    !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.map_or(true, |f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok() {
        let body = r#"{"symbol":"ETHUSDT","price":"2000.12345678"}"#;
        let price = parse_ticker_response(StatusCode::OK, body, "ETHUSDT").unwrap();
        assert_eq!(price, "2000.12345678");
    }

    #[test]
    fn test_non_success_status() {
        let body = r#"{"code":-1121,"msg":"Invalid symbol."}"#;
        let err = parse_ticker_response(StatusCode::BAD_REQUEST, body, "ETHUSDT").unwrap_err();
        assert!(err.to_string().contains("Invalid symbol."));

        let err = parse_ticker_response(StatusCode::BAD_GATEWAY, "<html>", "ETHUSDT").unwrap_err();
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_malformed_bodies() {
        let bodies = [
            "",
            "{}",
            r#"{"symbol":"ETHUSDT"}"#,
            r#"{"symbol":"ETHUSDT","price":2000.1}"#,
            r#"{"symbol":"ETHUSDT","price":""}"#,
            r#"{"symbol":"ETHUSDT","price":"abc"}"#,
        ];
        for body in bodies {
            assert!(
                parse_ticker_response(StatusCode::OK, body, "ETHUSDT").is_err(),
                "accepted {:?}",
                body
            );
        }
    }

    #[test]
    fn test_symbol_mismatch() {
        let body = r#"{"symbol":"BTCUSDT","price":"60000.00000000"}"#;
        assert!(parse_ticker_response(StatusCode::OK, body, "ETHUSDT").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = BinanceConfig::default();
        assert_eq!(config.rest_url, "https://api.binance.com");
        assert_eq!(config.symbol, "ETHUSDT");
    }
}
