use serde::Deserialize;

/// Response of `GET /api/v3/ticker/price?symbol=..`
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: String, // Decimal string, 8 fractional digits (e.g. "2000.12345678")
}

/// Error body returned by Binance on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub msg: String,
}
