use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use ethers::types::{Address, U256, U64};
use tracing::{debug, info};

use super::contract::OracleContract;
use crate::relay::PriceWriter;

/// Submits `setLatestEthPrice` transactions from the relay's account
pub struct OracleWriter {
    contract: OracleContract,
    owner_address: Address,
}

impl OracleWriter {
    pub fn new(contract: OracleContract, owner_address: Address) -> Self {
        Self {
            contract,
            owner_address,
        }
    }

    pub fn owner_address(&self) -> Address {
        self.owner_address
    }
}

#[async_trait]
impl PriceWriter for OracleWriter {
    /// Send the transaction and wait for its receipt.
    ///
    /// Dropped transactions and reverted receipts are errors.
    async fn set_latest_price(&self, caller_address: Address, price: U256, id: U256) -> Result<()> {
        let call = self
            .contract
            .set_latest_eth_price(price, caller_address, id)
            .from(self.owner_address);

        let pending = call
            .send()
            .await
            .context("Failed to submit setLatestEthPrice")?;
        let tx_hash = *pending;
        debug!("[ORACLE] setLatestEthPrice sent: {:?} (request #{})", tx_hash, id);

        let receipt = pending
            .await
            .with_context(|| format!("Failed to confirm transaction {:?}", tx_hash))?
            .with_context(|| format!("Transaction {:?} dropped from mempool", tx_hash))?;

        if receipt.status == Some(U64::zero()) {
            bail!("Transaction {:?} reverted", tx_hash);
        }

        info!(
            "[ORACLE] Price {} set for request #{} (caller {:?}, tx {:?})",
            price, id, caller_address, tx_hash
        );

        Ok(())
    }
}
