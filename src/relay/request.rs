use ethers::types::{Address, U256};
use std::fmt;

/// A caller contract's pending ask for the latest ETH price.
///
/// Identity is the `(id, caller_address)` pair. Nothing deduplicates on it:
/// an id emitted twice by the contract is relayed twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleRequest {
    /// Request id assigned by the oracle contract
    pub id: U256,
    /// Contract that asked for the price and receives the callback
    pub caller_address: Address,
}

impl OracleRequest {
    pub fn new(id: U256, caller_address: Address) -> Self {
        Self { id, caller_address }
    }
}

impl fmt::Display for OracleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} from {:?}", self.id, self.caller_address)
    }
}

/// Events emitted by the oracle contract that the relay listens to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleEvent {
    /// `GetLatestEthPriceEvent(callerAddress, id)`
    PriceRequested(OracleRequest),
    /// `SetLatestEthPriceEvent(ethPrice, callerAddress)`
    PriceSet { price: U256, caller_address: Address },
}
