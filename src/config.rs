use std::collections::HashMap;
use std::path::Path;

use alloy::primitives::Address;
use serde::Deserialize;

/// Deployment configuration loaded from TOML.
///
/// The allowlist lives here as explicit data instead of a constant baked
/// into each deploy script, so every call site builds the commitment from
/// the same source.
#[derive(Debug, Deserialize)]
pub struct AllowlistConfig {
    /// Addresses eligible to claim the badge. Parsed into [`Address`]
    /// once, here — case variants in the file normalize to the same leaf.
    pub allowlist: Vec<Address>,
    /// Badge contract deployments, keyed by chain label
    /// (e.g. `[chains.root]`, `[chains.child]`).
    pub chains: HashMap<String, ChainConfig>,
}

/// One badge contract deployment.
#[derive(Debug, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub private_key: String,
    /// Deployed badge contract address.
    pub badge_address: Address,
    /// Block explorer base URL for transaction links (e.g.
    /// "https://polygonscan.com/tx"). When absent, raw tx hashes are printed.
    pub explorer_url: Option<String>,
}

/// Errors from config loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AllowlistConfig {
    /// Load and validate a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowlist.is_empty() {
            return Err(ConfigError::Validation(
                "allowlist must contain at least one address".into(),
            ));
        }
        if self.chains.is_empty() {
            return Err(ConfigError::Validation(
                "at least one [chains.<label>] entry is required".into(),
            ));
        }
        Ok(())
    }
}
