use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Relay configuration: config.json (optional) overridden by environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Scheduler tick period in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum number of requests drained per tick
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Fetch attempts per request before the sentinel price is submitted
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Hex-encoded private key of the relay's account
    #[serde(default = "default_private_key_file")]
    pub private_key_file: String,

    /// Websocket JSON-RPC endpoint of the node
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Oracle contract address. When unset it is read from `oracle_artifact`
    #[serde(default)]
    pub oracle_address: Option<String>,

    /// Truffle build artifact holding the deployed address per network id
    #[serde(default = "default_oracle_artifact")]
    pub oracle_artifact: String,

    /// Price feed REST base URL
    #[serde(default = "default_price_api_url")]
    pub price_api_url: String,

    /// Trading pair whose price is relayed
    #[serde(default = "default_price_symbol")]
    pub price_symbol: String,

    /// HTTP timeout for one price fetch, in milliseconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,

    /// CSV file receiving one line per relayed request (disabled when unset)
    #[serde(default)]
    pub submission_log: Option<String>,
}

// Default values
fn default_poll_interval() -> u64 {
    2000 // 2 seconds
}

fn default_chunk_size() -> usize {
    3
}

fn default_max_retries() -> u32 {
    5
}

fn default_private_key_file() -> String {
    "./oracle/oracle_private_key".to_string()
}

fn default_rpc_url() -> String {
    "ws://127.0.0.1:8545".to_string()
}

fn default_oracle_artifact() -> String {
    "./oracle/build/contracts/EthPriceOracle.json".to_string()
}

fn default_price_api_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_price_symbol() -> String {
    "ETHUSDT".to_string()
}

fn default_fetch_timeout() -> u64 {
    10_000 // 10 seconds
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            chunk_size: default_chunk_size(),
            max_retries: default_max_retries(),
            private_key_file: default_private_key_file(),
            rpc_url: default_rpc_url(),
            oracle_address: None,
            oracle_artifact: default_oracle_artifact(),
            price_api_url: default_price_api_url(),
            price_symbol: default_price_symbol(),
            fetch_timeout_ms: default_fetch_timeout(),
            submission_log: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// config.json when present, defaults otherwise, then `.env` and environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = if Path::new("config.json").exists() {
            Self::from_file("config.json")?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    ///
    /// Empty, unparsable or zero numeric values keep the current setting.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        override_number(&lookup, "SLEEP_INTERVAL", &mut self.poll_interval_ms);
        override_number(&lookup, "CHUNK_SIZE", &mut self.chunk_size);
        override_number(&lookup, "MAX_RETRIES", &mut self.max_retries);
        override_number(&lookup, "FETCH_TIMEOUT_MS", &mut self.fetch_timeout_ms);

        override_string(&lookup, "PRIVATE_KEY_FILE", &mut self.private_key_file);
        override_string(&lookup, "RPC_URL", &mut self.rpc_url);
        override_string(&lookup, "ORACLE_ARTIFACT", &mut self.oracle_artifact);
        override_string(&lookup, "PRICE_API_URL", &mut self.price_api_url);
        override_string(&lookup, "PRICE_SYMBOL", &mut self.price_symbol);

        if let Some(value) = non_empty(&lookup, "ORACLE_ADDRESS") {
            self.oracle_address = Some(value);
        }
        if let Some(value) = non_empty(&lookup, "SUBMISSION_LOG") {
            self.submission_log = Some(value);
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.poll_interval_ms > 0, "Poll interval must be greater than 0");
        anyhow::ensure!(self.chunk_size > 0, "Chunk size must be greater than 0");
        anyhow::ensure!(self.max_retries > 0, "Max retries must be greater than 0");
        anyhow::ensure!(self.fetch_timeout_ms > 0, "Fetch timeout must be greater than 0");

        anyhow::ensure!(!self.private_key_file.is_empty(), "Private key file cannot be empty");
        anyhow::ensure!(!self.rpc_url.is_empty(), "RPC URL cannot be empty");
        anyhow::ensure!(!self.price_symbol.is_empty(), "Price symbol cannot be empty");

        anyhow::ensure!(
            self.rpc_url.starts_with("ws://") || self.rpc_url.starts_with("wss://"),
            "RPC URL must be a websocket endpoint (ws:// or wss://): {}",
            self.rpc_url
        );

        Ok(())
    }
}

fn non_empty<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn override_string<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, target: &mut String) {
    if let Some(value) = non_empty(lookup, key) {
        *target = value;
    }
}

fn override_number<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialEq + Default + Copy + std::fmt::Display,
{
    let Some(value) = non_empty(lookup, key) else {
        return;
    };

    match value.parse::<T>() {
        Ok(parsed) if parsed != T::default() => *target = parsed,
        _ => warn!("[CONFIG] Ignoring {}={:?}, keeping {}", key, value, target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.chunk_size, 3);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.private_key_file, "./oracle/oracle_private_key");
        assert_eq!(config.price_symbol, "ETHUSDT");
        assert!(config.oracle_address.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let path = std::env::temp_dir().join("eth_price_oracle_test_config.json");
        fs::write(&path, r#"{ "chunk_size": 10, "rpc_url": "wss://node.example" }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.rpc_url, "wss://node.example");
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.max_retries, 5);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("SLEEP_INTERVAL", "500"),
            ("CHUNK_SIZE", "7"),
            ("MAX_RETRIES", "2"),
            ("PRIVATE_KEY_FILE", "/keys/oracle"),
            ("ORACLE_ADDRESS", "0x5FbDB2315678afecb367f032d93F642f64180aa3"),
        ]));

        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.chunk_size, 7);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.private_key_file, "/keys/oracle");
        assert_eq!(
            config.oracle_address.as_deref(),
            Some("0x5FbDB2315678afecb367f032d93F642f64180aa3")
        );
    }

    #[test]
    fn test_invalid_env_values_keep_defaults() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("SLEEP_INTERVAL", "soon"),
            ("CHUNK_SIZE", "0"),
            ("MAX_RETRIES", ""),
            ("PRIVATE_KEY_FILE", "  "),
        ]));

        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.chunk_size, 3);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.private_key_file, "./oracle/oracle_private_key");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.chunk_size = 0;
        assert!(config.validate().is_err());

        config.chunk_size = 3;
        config.max_retries = 0;
        assert!(config.validate().is_err());

        config.max_retries = 5;
        config.rpc_url = "http://127.0.0.1:8545".to_string();
        assert!(config.validate().is_err());
    }
}
