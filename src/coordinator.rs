use std::collections::HashMap;

use alloy::primitives::{Address, B256};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::merkle::{AllowlistError, AllowlistTree, MerkleProof};
use crate::ports::chain::{ChainError, ChainPort};
use crate::ports::TxReceipt;

/// Error type for lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("no allowlist tree built yet: call rebuild first")]
    NoTree,

    #[error("root already published: use replace for allowlist updates")]
    AlreadyPublished,

    #[error("no root published yet: use publish first")]
    NotPublished,

    #[error("unknown chain: {0}")]
    UnknownChain(String),

    #[error("allowlist error: {0}")]
    Allowlist(#[from] AllowlistError),

    #[error("chain error on {chain}: {source}")]
    Chain {
        chain: String,
        #[source]
        source: ChainError,
    },
}

/// Lifecycle state guarded by one lock, so at most one publish or replace
/// is in flight at a time.
struct State {
    tree: Option<AllowlistTree>,
    /// Root currently accepted by the contracts, mirroring the on-chain
    /// slot. `None` until the first publish (or `sync` against a chain
    /// that already holds a root).
    published: Option<B256>,
}

/// Commitment lifecycle coordinator.
///
/// Owns the list-to-root-to-proof pipeline end to end: build the tree once,
/// publish its root to every registered badge contract, replace it on
/// allowlist changes, and generate/check claim proofs against whatever root
/// is currently published. Both the deploy-time and claim-time call sites
/// go through this one type, so the tree is never rebuilt with drifting
/// hashing rules.
///
/// Generic over `ChainPort`; one port per chain the badge is deployed on
/// (the cross-ledger case is just the same root value pushed to each).
pub struct AllowlistCoordinator<C: ChainPort> {
    /// chain label → badge contract port ("root", "child", ...)
    chains: HashMap<String, C>,
    state: Mutex<State>,
}

impl<C: ChainPort> AllowlistCoordinator<C> {
    pub fn new(chains: HashMap<String, C>) -> Self {
        Self {
            chains,
            state: Mutex::new(State {
                tree: None,
                published: None,
            }),
        }
    }

    /// Build a fresh tree from the allowlist and return its root.
    ///
    /// Pure with respect to the chains: nothing is published until
    /// [`publish`](Self::publish) or [`replace`](Self::replace).
    pub async fn rebuild(&self, allowlist: &[Address]) -> Result<B256, CoordinatorError> {
        let tree = AllowlistTree::build(allowlist)?;
        let root = tree.root();
        info!(leaves = tree.leaf_count(), root = %root, "rebuilt allowlist tree");
        self.state.lock().await.tree = Some(tree);
        Ok(root)
    }

    /// The root currently accepted as valid, if any.
    pub async fn current_root(&self) -> Option<B256> {
        self.state.lock().await.published
    }

    /// The port registered under `label`, if any.
    pub fn chain(&self, label: &str) -> Option<&C> {
        self.chains.get(label)
    }

    /// Chains in sorted-label order, so multi-chain walks are
    /// deterministic across runs.
    fn chains_sorted(&self) -> Vec<(&String, &C)> {
        let mut chains: Vec<_> = self.chains.iter().collect();
        chains.sort_by(|a, b| a.0.cmp(b.0));
        chains
    }

    /// Re-read the published root from the chains.
    ///
    /// The published commitment lives in the contracts, not in this
    /// process; a zero root means the slot was never set. Chains are read
    /// in sorted label order; when they disagree, the first non-zero root
    /// is adopted and a warning is logged — a replace brings them back in
    /// line.
    pub async fn sync(&self) -> Result<Option<B256>, CoordinatorError> {
        let mut published = None;
        for (label, chain) in self.chains_sorted() {
            let root = chain
                .merkle_root()
                .await
                .map_err(|source| CoordinatorError::Chain {
                    chain: label.clone(),
                    source,
                })?;
            if root == B256::ZERO {
                continue;
            }
            match published {
                None => published = Some(root),
                Some(seen) if seen != root => {
                    warn!(chain = %label, %root, expected = %seen, "published roots disagree across chains");
                }
                Some(_) => {}
            }
        }
        self.state.lock().await.published = published;
        Ok(published)
    }

    /// First publish of the built tree's root to every registered chain.
    ///
    /// Returns one `(chain label, receipt)` pair per chain.
    /// `Unpublished -> Published`; once published, updates must go through
    /// [`replace`](Self::replace). There is no unpublish.
    pub async fn publish(&self) -> Result<Vec<(String, TxReceipt)>, CoordinatorError> {
        let mut state = self.state.lock().await;
        if state.published.is_some() {
            return Err(CoordinatorError::AlreadyPublished);
        }
        self.push_root(&mut state).await
    }

    /// Replace the published root with the current tree's root on every
    /// registered chain. Proofs generated against the old root become
    /// invalid; callers regenerate them via [`prove`](Self::prove).
    pub async fn replace(&self) -> Result<Vec<(String, TxReceipt)>, CoordinatorError> {
        let mut state = self.state.lock().await;
        if state.published.is_none() {
            return Err(CoordinatorError::NotPublished);
        }
        self.push_root(&mut state).await
    }

    /// Send the built root to all chains and update the local mirror.
    ///
    /// `setMerkleRoot` is idempotent, so rerunning after a partial failure
    /// is safe — the local mirror is only updated once every chain accepted
    /// the root.
    async fn push_root(
        &self,
        state: &mut State,
    ) -> Result<Vec<(String, TxReceipt)>, CoordinatorError> {
        let root = state.tree.as_ref().ok_or(CoordinatorError::NoTree)?.root();

        let mut receipts = Vec::with_capacity(self.chains.len());
        for (label, chain) in self.chains_sorted() {
            let receipt = chain
                .set_merkle_root(root)
                .await
                .map_err(|source| CoordinatorError::Chain {
                    chain: label.clone(),
                    source,
                })?;
            info!(chain = %label, %root, tx = %receipt.tx_hash, "merkle root set");
            receipts.push((label.clone(), receipt));
        }

        state.published = Some(root);
        Ok(receipts)
    }

    /// Generate a membership proof for `address` against the built tree.
    pub async fn prove(&self, address: &Address) -> Result<MerkleProof, CoordinatorError> {
        let state = self.state.lock().await;
        let tree = state.tree.as_ref().ok_or(CoordinatorError::NoTree)?;
        Ok(tree.prove(address)?)
    }

    /// Check a proof against the currently published root.
    ///
    /// Plain `false` covers both a bad proof and a proof generated before
    /// the last replace.
    pub async fn verify(
        &self,
        address: &Address,
        proof: &MerkleProof,
    ) -> Result<bool, CoordinatorError> {
        let published = self
            .current_root()
            .await
            .ok_or(CoordinatorError::NotPublished)?;
        Ok(proof.verify(address, published))
    }

    /// Prove membership for `address` and submit the claim on `chain`.
    ///
    /// The contract derives the leaf from the transaction sender, so
    /// `address` must be the signing account of that chain's port.
    pub async fn claim(
        &self,
        chain: &str,
        address: &Address,
    ) -> Result<TxReceipt, CoordinatorError> {
        let port = self
            .chains
            .get(chain)
            .ok_or_else(|| CoordinatorError::UnknownChain(chain.to_string()))?;
        let proof = self.prove(address).await?;
        port.claim(&proof.siblings)
            .await
            .map_err(|source| CoordinatorError::Chain {
                chain: chain.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock_chain::MockChainPort;

    fn allowlist() -> Vec<Address> {
        (1u8..=5).map(Address::repeat_byte).collect()
    }

    fn coordinator() -> AllowlistCoordinator<MockChainPort> {
        let mut chains = HashMap::new();
        chains.insert("root".to_string(), MockChainPort::new());
        chains.insert("child".to_string(), MockChainPort::new());
        AllowlistCoordinator::new(chains)
    }

    #[tokio::test]
    async fn test_rebuild_is_deterministic() {
        let coordinator = coordinator();
        let first = coordinator.rebuild(&allowlist()).await.unwrap();
        let second = coordinator.rebuild(&allowlist()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rebuild_does_not_publish() {
        let coordinator = coordinator();
        coordinator.rebuild(&allowlist()).await.unwrap();
        assert_eq!(coordinator.current_root().await, None);
        for chain in coordinator.chains.values() {
            assert_eq!(chain.merkle_root().await.unwrap(), B256::ZERO);
        }
    }

    #[tokio::test]
    async fn test_publish_before_rebuild_rejected() {
        let coordinator = coordinator();
        let err = coordinator.publish().await.unwrap_err();
        assert!(matches!(err, CoordinatorError::NoTree));
    }

    #[tokio::test]
    async fn test_publish_sets_root_on_all_chains() {
        let coordinator = coordinator();
        let root = coordinator.rebuild(&allowlist()).await.unwrap();

        let receipts = coordinator.publish().await.unwrap();
        assert_eq!(receipts.len(), 2);
        assert!(receipts.iter().all(|(_, r)| r.success));
        assert_eq!(coordinator.current_root().await, Some(root));

        for chain in coordinator.chains.values() {
            assert_eq!(chain.merkle_root().await.unwrap(), root);
        }
    }

    #[tokio::test]
    async fn test_second_publish_rejected() {
        let coordinator = coordinator();
        coordinator.rebuild(&allowlist()).await.unwrap();
        coordinator.publish().await.unwrap();

        let err = coordinator.publish().await.unwrap_err();
        assert!(matches!(err, CoordinatorError::AlreadyPublished));
    }

    #[tokio::test]
    async fn test_replace_before_publish_rejected() {
        let coordinator = coordinator();
        coordinator.rebuild(&allowlist()).await.unwrap();

        let err = coordinator.replace().await.unwrap_err();
        assert!(matches!(err, CoordinatorError::NotPublished));
    }

    #[tokio::test]
    async fn test_replace_updates_root_and_invalidates_old_proofs() {
        let coordinator = coordinator();
        let members = allowlist();
        coordinator.rebuild(&members).await.unwrap();
        coordinator.publish().await.unwrap();

        let removed = members[0];
        let old_proof = coordinator.prove(&removed).await.unwrap();
        assert!(coordinator.verify(&removed, &old_proof).await.unwrap());

        let trimmed: Vec<Address> = members[1..].to_vec();
        let new_root = coordinator.rebuild(&trimmed).await.unwrap();
        coordinator.replace().await.unwrap();

        assert_eq!(coordinator.current_root().await, Some(new_root));
        for chain in coordinator.chains.values() {
            assert_eq!(chain.merkle_root().await.unwrap(), new_root);
        }

        // Proof generated before the replace no longer verifies.
        assert!(!coordinator.verify(&removed, &old_proof).await.unwrap());
        assert!(matches!(
            coordinator.prove(&removed).await,
            Err(CoordinatorError::Allowlist(AllowlistError::NotFound(_)))
        ));

        // Surviving members verify after regenerating.
        let fresh = coordinator.prove(&trimmed[0]).await.unwrap();
        assert!(coordinator.verify(&trimmed[0], &fresh).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_before_publish_rejected() {
        let coordinator = coordinator();
        let members = allowlist();
        coordinator.rebuild(&members).await.unwrap();
        let proof = coordinator.prove(&members[0]).await.unwrap();

        let err = coordinator.verify(&members[0], &proof).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::NotPublished));
    }

    #[tokio::test]
    async fn test_sync_picks_up_seeded_root() {
        let coordinator = coordinator();
        let root = AllowlistTree::build(&allowlist()).unwrap().root();
        for chain in coordinator.chains.values() {
            chain.seed_root(root).await;
        }

        assert_eq!(coordinator.sync().await.unwrap(), Some(root));
        assert_eq!(coordinator.current_root().await, Some(root));

        // With a synced root, the state machine is in Published: a fresh
        // publish is rejected and replace goes through.
        coordinator.rebuild(&allowlist()[1..]).await.unwrap();
        assert!(matches!(
            coordinator.publish().await,
            Err(CoordinatorError::AlreadyPublished)
        ));
        coordinator.replace().await.unwrap();
    }

    #[tokio::test]
    async fn test_sync_disagreeing_chains_adopts_first_label() {
        let coordinator = coordinator();
        let child_root = B256::repeat_byte(0xAA);
        let root_root = B256::repeat_byte(0xBB);
        coordinator.chains["child"].seed_root(child_root).await;
        coordinator.chains["root"].seed_root(root_root).await;

        // "child" sorts before "root", so its root wins on every run.
        assert_eq!(coordinator.sync().await.unwrap(), Some(child_root));
        assert_eq!(coordinator.sync().await.unwrap(), Some(child_root));

        // A replace reconverges the chains on one root.
        let new_root = coordinator.rebuild(&allowlist()).await.unwrap();
        coordinator.replace().await.unwrap();
        for chain in coordinator.chains.values() {
            assert_eq!(chain.merkle_root().await.unwrap(), new_root);
        }
        assert_eq!(coordinator.current_root().await, Some(new_root));
    }

    #[tokio::test]
    async fn test_sync_on_fresh_chains_is_unpublished() {
        let coordinator = coordinator();
        assert_eq!(coordinator.sync().await.unwrap(), None);
        assert_eq!(coordinator.current_root().await, None);
    }

    #[tokio::test]
    async fn test_claim_submits_proof() {
        let coordinator = coordinator();
        let members = allowlist();
        coordinator.rebuild(&members).await.unwrap();
        coordinator.publish().await.unwrap();

        let receipt = coordinator.claim("child", &members[2]).await.unwrap();
        assert!(receipt.success);

        let claims = coordinator.chains["child"].submitted_claims().await;
        assert_eq!(claims.len(), 1);

        // The recorded proof verifies against the published root.
        let proof = MerkleProof {
            siblings: claims[0].clone(),
        };
        assert!(coordinator.verify(&members[2], &proof).await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_unknown_chain_rejected() {
        let coordinator = coordinator();
        let members = allowlist();
        coordinator.rebuild(&members).await.unwrap();

        let err = coordinator.claim("mainnet", &members[0]).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::UnknownChain(_)));
    }

    #[tokio::test]
    async fn test_claim_for_outsider_not_found() {
        let coordinator = coordinator();
        coordinator.rebuild(&allowlist()).await.unwrap();

        let outsider = Address::repeat_byte(0xFF);
        let err = coordinator.claim("root", &outsider).await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Allowlist(AllowlistError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_publish_surfaces_chain_error() {
        let mut chains = HashMap::new();
        chains.insert("root".to_string(), MockChainPort::unauthorized());
        let coordinator = AllowlistCoordinator::new(chains);

        coordinator.rebuild(&allowlist()).await.unwrap();
        let err = coordinator.publish().await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Chain { .. }));

        // Failed publish leaves the state machine in Unpublished.
        assert_eq!(coordinator.current_root().await, None);
    }

    #[tokio::test]
    async fn test_unauthorized_replace_keeps_old_root() {
        let old_root = AllowlistTree::build(&allowlist()).unwrap().root();
        let admin = MockChainPort::new();
        admin.seed_root(old_root).await;
        let revoked = MockChainPort::unauthorized();
        revoked.seed_root(old_root).await;

        let mut chains = HashMap::new();
        chains.insert("alpha".to_string(), admin);
        chains.insert("beta".to_string(), revoked);
        let coordinator = AllowlistCoordinator::new(chains);
        assert_eq!(coordinator.sync().await.unwrap(), Some(old_root));

        let new_root = coordinator.rebuild(&allowlist()[1..]).await.unwrap();
        let err = coordinator.replace().await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Chain { .. }));

        // Partial failure: the local mirror still holds the old root, so
        // the reverting chain stays consistent with it.
        assert_eq!(coordinator.current_root().await, Some(old_root));
        assert_eq!(
            coordinator.chains["beta"].merkle_root().await.unwrap(),
            old_root
        );
        // "alpha" accepted the new root before "beta" reverted; rerunning
        // the replace once the key is fixed converges it (setMerkleRoot is
        // idempotent).
        assert_eq!(
            coordinator.chains["alpha"].merkle_root().await.unwrap(),
            new_root
        );
    }
}
