use ethers::middleware::SignerMiddleware;
use ethers::prelude::abigen;
use ethers::providers::{Provider, Ws};
use ethers::signers::LocalWallet;

use crate::relay::{OracleEvent, OracleRequest};

abigen!(
    EthPriceOracle,
    r#"[
        function setLatestEthPrice(uint256 _ethPrice, address _callerAddress, uint256 _id)
        event GetLatestEthPriceEvent(address callerAddress, uint256 id)
        event SetLatestEthPriceEvent(uint256 ethPrice, address callerAddress)
    ]"#
);

/// Websocket provider signing with the relay's own key
pub type OracleSigner = SignerMiddleware<Provider<Ws>, LocalWallet>;

pub type OracleContract = EthPriceOracle<OracleSigner>;

impl From<EthPriceOracleEvents> for OracleEvent {
    fn from(event: EthPriceOracleEvents) -> Self {
        match event {
            EthPriceOracleEvents::GetLatestEthPriceEventFilter(e) => {
                OracleEvent::PriceRequested(OracleRequest::new(e.id, e.caller_address))
            }
            EthPriceOracleEvents::SetLatestEthPriceEventFilter(e) => OracleEvent::PriceSet {
                price: e.eth_price,
                caller_address: e.caller_address,
            },
        }
    }
}
