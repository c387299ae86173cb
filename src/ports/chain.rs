use alloy::primitives::B256;
use std::future::Future;

use super::TxReceipt;

/// Port for one deployed badge contract (one instance per chain).
///
/// Implementations:
/// - `EthereumRpc` (alloy)
/// - `MockChainPort` for coordinator tests and the demo
///
/// Authorization for `set_merkle_root` lives with the contract's admin
/// role; the port only carries the transaction and surfaces a revert.
pub trait ChainPort: Send + Sync {
    /// Read the Merkle root the contract currently accepts.
    ///
    /// A zero root means no commitment has been published yet (the unset
    /// storage slot).
    fn merkle_root(&self) -> impl Future<Output = Result<B256, ChainError>> + Send;

    /// Overwrite the contract's Merkle root — the deploy-time publish and
    /// every later allowlist update go through this.
    fn set_merkle_root(
        &self,
        root: B256,
    ) -> impl Future<Output = Result<TxReceipt, ChainError>> + Send;

    /// Submit a claim with a membership proof. The contract re-derives the
    /// leaf from the transaction sender, so the proof must have been
    /// generated for the signing address.
    fn claim(
        &self,
        proof: &[B256],
    ) -> impl Future<Output = Result<TxReceipt, ChainError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("RPC error: {0}")]
    Rpc(String),
}
