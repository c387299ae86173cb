//! Allowlist commitment tool for the members badge contracts.
//!
//! Replaces the per-network deploy/update scripts with one binary driving
//! the shared commitment pipeline: print the root for a deployment, publish
//! it, replace it after an allowlist change, or generate and submit a claim
//! proof.
//!
//! Run with:
//!   cargo run --bin allowlist -- --config allowlist.toml root

use std::collections::HashMap;
use std::path::PathBuf;

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use badge_allowlist::adapters::ethereum::EthereumRpc;
use badge_allowlist::config::{AllowlistConfig, ConfigError};
use badge_allowlist::coordinator::{AllowlistCoordinator, CoordinatorError};
use badge_allowlist::ports::chain::ChainError;

#[derive(Parser)]
#[command(name = "allowlist", about = "Merkle allowlist commitment tool")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "./allowlist.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the tree and print the commitment root.
    Root,
    /// First publish: set the root on every configured chain.
    Publish,
    /// Replace the published root after an allowlist change.
    Update,
    /// Print the membership proof for an address.
    Prove { address: Address },
    /// Prove membership for a chain's signer and submit the claim.
    Claim {
        #[arg(long)]
        chain: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),

    #[error("unknown chain: {0}")]
    UnknownChain(String),

    #[error("invalid private key for chain {0}")]
    InvalidKey(String),
}

/// Returns a block explorer link for the transaction, or the raw hash if no
/// explorer is configured.
fn tx_link(explorer_url: Option<&str>, tx_hash: B256) -> String {
    match explorer_url {
        Some(base) => format!("{base}/{tx_hash:#x}"),
        None => format!("{tx_hash:#x}"),
    }
}

async fn build_coordinator(
    config: &AllowlistConfig,
) -> Result<AllowlistCoordinator<EthereumRpc>, CliError> {
    let mut chains = HashMap::new();
    for (label, chain) in &config.chains {
        let rpc = EthereumRpc::new(&chain.rpc_url, &chain.private_key, chain.badge_address).await?;
        chains.insert(label.clone(), rpc);
    }
    Ok(AllowlistCoordinator::new(chains))
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = AllowlistConfig::load(&args.config)?;

    match args.command {
        Command::Root => {
            let coordinator = build_coordinator(&config).await?;
            let root = coordinator.rebuild(&config.allowlist).await?;
            println!("{root:#x}");
        }
        Command::Publish => {
            let coordinator = build_coordinator(&config).await?;
            coordinator.sync().await?;
            let root = coordinator.rebuild(&config.allowlist).await?;
            let receipts = coordinator.publish().await?;
            info!(%root, chains = receipts.len(), "root published");
            for (label, receipt) in &receipts {
                let explorer = config.chains[label].explorer_url.as_deref();
                println!("{label}: {}", tx_link(explorer, receipt.tx_hash));
            }
        }
        Command::Update => {
            let coordinator = build_coordinator(&config).await?;
            coordinator.sync().await?;
            let root = coordinator.rebuild(&config.allowlist).await?;
            let receipts = coordinator.replace().await?;
            info!(%root, chains = receipts.len(), "root replaced");
            for (label, receipt) in &receipts {
                let explorer = config.chains[label].explorer_url.as_deref();
                println!("{label}: {}", tx_link(explorer, receipt.tx_hash));
            }
        }
        Command::Prove { address } => {
            let coordinator = build_coordinator(&config).await?;
            let published = coordinator.sync().await?;
            let root = coordinator.rebuild(&config.allowlist).await?;
            match published {
                Some(published) if published != root => {
                    warn!(%root, %published, "allowlist drifted from the published root; run update before claiming");
                }
                None => {
                    warn!(%root, "no root published yet; run publish before claiming");
                }
                Some(_) => {}
            }
            let proof = coordinator.prove(&address).await?;
            for sibling in &proof.siblings {
                println!("{sibling:#x}");
            }
        }
        Command::Claim { chain } => {
            let chain_config = config
                .chains
                .get(&chain)
                .ok_or_else(|| CliError::UnknownChain(chain.clone()))?;
            // The contract derives the leaf from msg.sender, so the proof
            // is generated for the configured signer's address.
            let signer: PrivateKeySigner = chain_config
                .private_key
                .parse()
                .map_err(|_| CliError::InvalidKey(chain.clone()))?;
            let claimer = signer.address();

            let coordinator = build_coordinator(&config).await?;
            coordinator.rebuild(&config.allowlist).await?;
            let receipt = coordinator.claim(&chain, &claimer).await?;
            info!(%claimer, chain = %chain, "claim submitted");
            println!(
                "{}",
                tx_link(chain_config.explorer_url.as_deref(), receipt.tx_hash)
            );
        }
    }

    Ok(())
}
