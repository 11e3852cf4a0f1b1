use anyhow::{Context, Result};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Middleware, Provider, Ws};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use super::contract::{EthPriceOracle, OracleContract};

/// Everything the relay needs from the network, resolved once at startup
pub struct OracleConnection {
    pub owner_address: Address,
    pub chain_id: u64,
    pub contract: OracleContract,
}

/// Truffle build artifact, only the deployed addresses are read
#[derive(Debug, Deserialize)]
struct BuildArtifact {
    #[serde(default)]
    networks: HashMap<String, DeployedNetwork>,
}

#[derive(Debug, Deserialize)]
struct DeployedNetwork {
    address: String,
}

/// Load the relay's signing key from a hex key file (optional `0x` prefix)
pub fn load_wallet<P: AsRef<Path>>(path: P) -> Result<LocalWallet> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read private key file: {}", path.display()))?;

    LocalWallet::from_str(content.trim())
        .with_context(|| format!("Invalid private key in {}", path.display()))
}

/// Find the oracle address for `chain_id` in a build artifact
pub fn address_from_artifact(artifact_json: &str, chain_id: u64) -> Result<Address> {
    let artifact: BuildArtifact =
        serde_json::from_str(artifact_json).context("Failed to parse contract artifact")?;

    let network = artifact
        .networks
        .get(&chain_id.to_string())
        .with_context(|| format!("Oracle contract not deployed on network {}", chain_id))?;

    Address::from_str(&network.address)
        .with_context(|| format!("Invalid oracle address in artifact: {}", network.address))
}

/// An explicit address wins, otherwise the artifact is consulted
pub fn resolve_oracle_address(
    explicit: Option<&str>,
    artifact_path: &str,
    chain_id: u64,
) -> Result<Address> {
    if let Some(address) = explicit {
        return Address::from_str(address)
            .with_context(|| format!("Invalid oracle address: {}", address));
    }

    let content = fs::read_to_string(artifact_path)
        .with_context(|| format!("Failed to read contract artifact: {}", artifact_path))?;
    address_from_artifact(&content, chain_id)
}

/// Connect to the node, load the signer and bind the oracle contract
pub async fn connect(
    rpc_url: &str,
    private_key_file: &str,
    oracle_address: Option<&str>,
    oracle_artifact: &str,
) -> Result<OracleConnection> {
    let wallet = load_wallet(private_key_file)?;

    let provider = Provider::<Ws>::connect(rpc_url)
        .await
        .with_context(|| format!("Failed to connect to node at {}", rpc_url))?;
    let chain_id = provider
        .get_chainid()
        .await
        .context("Failed to fetch chain id")?
        .as_u64();

    let wallet = wallet.with_chain_id(chain_id);
    let owner_address = wallet.address();

    let address = resolve_oracle_address(oracle_address, oracle_artifact, chain_id)?;
    let client = Arc::new(SignerMiddleware::new(provider, wallet));
    let contract = EthPriceOracle::new(address, client);

    info!(
        "[ORACLE] Connected to chain {} | oracle {:?} | owner {:?}",
        chain_id, address, owner_address
    );

    Ok(OracleConnection {
        owner_address,
        chain_id,
        contract,
    })
}
