use anyhow::{Context, Result};
use ethers::core::rand::thread_rng;
use ethers::signers::{LocalWallet, Signer};
use ethers::utils::hex;
use std::fs;
use std::path::Path;

/// Generate the relay's signing key and write it, hex encoded, to the given path
fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() <= 1 {
        eprintln!("Usage: {} <filename>", args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    anyhow::ensure!(
        !path.exists(),
        "Refusing to overwrite existing key file: {}",
        path.display()
    );

    let wallet = LocalWallet::new(&mut thread_rng());
    let private_key = format!("0x{}", hex::encode(wallet.signer().to_bytes()));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, private_key)
        .with_context(|| format!("Failed to write key file: {}", path.display()))?;

    println!("Key written to {}", path.display());
    println!("Oracle owner address: {:?}", wallet.address());

    Ok(())
}
