use anyhow::{bail, Context, Result};
use ethers::types::U256;
use tracing::warn;

/// Fractional digits in the price feed's decimal strings (Binance returns 8).
pub const FEED_DECIMALS: usize = 8;

/// Fixed-point precision expected by the oracle contract.
pub const CONTRACT_DECIMALS: usize = 18;

/// Price submitted when every fetch attempt failed ("price unavailable").
pub const SENTINEL_PRICE: &str = "0";

/// Multiplier applied to the feed's digits once the decimal point is removed.
///
/// Only correct while the feed keeps exactly `FEED_DECIMALS` fractional digits.
pub fn scale_multiplier() -> U256 {
    U256::exp10(CONTRACT_DECIMALS - FEED_DECIMALS)
}

/// Convert a feed price such as `"2000.12345678"` to the contract's
/// fixed-point integer (`200012345678 * 10^10`).
///
/// The decimal point is dropped and the remaining digits are scaled by
/// [`scale_multiplier`]. A fractional part that is not `FEED_DECIMALS` long is
/// converted the same way and only logged.
pub fn scale_price(price: &str) -> Result<U256> {
    let (whole, fraction) = match price.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (price, ""),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        bail!("Malformed price: {:?}", price);
    }
    if price.contains('.') && (fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit())) {
        bail!("Malformed price: {:?}", price);
    }

    if !fraction.is_empty() && fraction.len() != FEED_DECIMALS {
        warn!(
            "[FIXED_POINT] Price {} has {} fractional digits, expected {}; submitted value will be off",
            price,
            fraction.len(),
            FEED_DECIMALS
        );
    }

    let digits = format!("{}{}", whole, fraction);
    let unscaled = U256::from_dec_str(&digits)
        .map_err(|e| anyhow::anyhow!("{:?}", e))
        .with_context(|| format!("Price out of range: {}", price))?;

    unscaled
        .checked_mul(scale_multiplier())
        .with_context(|| format!("Scaled price overflows uint256: {}", price))
}
