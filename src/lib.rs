// Library exports for eth_price_oracle

pub mod app;
pub mod config;
pub mod connector;
pub mod csv_logger;
pub mod relay;
pub mod services;

// Re-export commonly used items for convenience
pub use app::OracleRelay;
pub use config::Config;
