mod account;
mod contract;
mod writer;

pub use account::{address_from_artifact, connect, load_wallet, resolve_oracle_address, OracleConnection};
pub use contract::{
    EthPriceOracle, EthPriceOracleEvents, GetLatestEthPriceEventFilter, OracleContract,
    OracleSigner, SetLatestEthPriceEventFilter,
};
pub use writer::OracleWriter;
