pub mod binance;
pub mod oracle;
