use alloy::primitives::{keccak256, B256};
use tokio::sync::Mutex;

use crate::ports::chain::{ChainError, ChainPort};
use crate::ports::TxReceipt;

/// In-memory mock of `ChainPort` for coordinator tests and the demo.
///
/// Holds the root the way the badge contract's `merkleRoot` slot would
/// (zero until the first `setMerkleRoot`) and records submitted claim
/// proofs for assertions.
pub struct MockChainPort {
    root: Mutex<B256>,
    claims: Mutex<Vec<Vec<B256>>>,
    /// Simulates the admin role check: when false, `set_merkle_root`
    /// reverts the way the contract would for a non-admin sender.
    authorized: bool,
}

impl MockChainPort {
    pub fn new() -> Self {
        Self {
            root: Mutex::new(B256::ZERO),
            claims: Mutex::new(Vec::new()),
            authorized: true,
        }
    }

    /// A port whose signer lacks the admin role.
    pub fn unauthorized() -> Self {
        Self {
            authorized: false,
            ..Self::new()
        }
    }

    /// Pre-set the stored root (simulates a root published in an earlier
    /// process run).
    pub async fn seed_root(&self, root: B256) {
        *self.root.lock().await = root;
    }

    /// Claim proofs submitted so far (for test assertions).
    pub async fn submitted_claims(&self) -> Vec<Vec<B256>> {
        self.claims.lock().await.clone()
    }
}

impl Default for MockChainPort {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainPort for MockChainPort {
    async fn merkle_root(&self) -> Result<B256, ChainError> {
        Ok(*self.root.lock().await)
    }

    async fn set_merkle_root(&self, root: B256) -> Result<TxReceipt, ChainError> {
        if !self.authorized {
            return Err(ChainError::TransactionFailed(
                "setMerkleRoot reverted: caller is not an admin".into(),
            ));
        }
        *self.root.lock().await = root;
        Ok(TxReceipt {
            tx_hash: keccak256(root),
            success: true,
        })
    }

    async fn claim(&self, proof: &[B256]) -> Result<TxReceipt, ChainError> {
        self.claims.lock().await.push(proof.to_vec());
        Ok(TxReceipt {
            tx_hash: keccak256(
                proof
                    .iter()
                    .flat_map(|s| s.0)
                    .collect::<Vec<u8>>(),
            ),
            success: true,
        })
    }
}
