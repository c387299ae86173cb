use alloy::primitives::{keccak256, Address, B256};
use serde::{Deserialize, Serialize};

use super::identity::leaf_hash;

/// Errors from allowlist tree construction and proof generation.
#[derive(Debug, thiserror::Error)]
pub enum AllowlistError {
    #[error("identity must be {expected} bytes, got {got}")]
    InvalidIdentityLength { expected: usize, got: usize },

    #[error("cannot build a commitment over an empty allowlist")]
    EmptyAllowlist,

    #[error("address is not on the allowlist: {0}")]
    NotFound(Address),
}

/// Hash a node pair into its parent: `keccak256(min(a,b) ++ max(a,b))`.
///
/// Sorting before concatenation makes the combine step commutative, so
/// proofs need no left/right flags. Must stay bit-identical to the pair
/// hash the badge contracts verify with.
fn hash_pair(a: &B256, b: &B256) -> B256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo.as_slice());
    buf[32..].copy_from_slice(hi.as_slice());
    keccak256(buf)
}

/// Merkle tree over the hashed allowlist addresses.
///
/// Leaves are sorted and deduplicated before the first reduction, so the
/// root depends only on the set of addresses, never on the order the
/// allowlist file was written in. An unpaired node at the end of an odd
/// level is carried up unchanged — no self-duplication.
///
/// The tree is a value: an allowlist change means building a new tree and
/// replacing the published root, never mutating in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowlistTree {
    /// `levels[0]` holds the sorted leaves; the last level is the root alone.
    levels: Vec<Vec<B256>>,
}

impl AllowlistTree {
    /// Build the commitment tree for an allowlist.
    pub fn build(allowlist: &[Address]) -> Result<Self, AllowlistError> {
        if allowlist.is_empty() {
            return Err(AllowlistError::EmptyAllowlist);
        }

        let mut leaves: Vec<B256> = allowlist.iter().map(leaf_hash).collect();
        leaves.sort_unstable();
        leaves.dedup();

        let mut levels = Vec::new();
        let mut current = leaves;
        while current.len() > 1 {
            let next = current
                .chunks(2)
                .map(|pair| match pair {
                    [a, b] => hash_pair(a, b),
                    // Odd node: promoted unchanged to the next level.
                    [a] => *a,
                    _ => unreachable!("chunks(2) yields one- or two-element slices"),
                })
                .collect();
            levels.push(current);
            current = next;
        }
        levels.push(current);

        Ok(Self { levels })
    }

    /// The commitment root the badge contracts store.
    pub fn root(&self) -> B256 {
        // Construction guarantees a non-empty top level.
        self.levels[self.levels.len() - 1][0]
    }

    /// Number of distinct leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// The sorted, deduplicated leaf layer.
    pub fn leaves(&self) -> &[B256] {
        &self.levels[0]
    }

    /// Generate the sibling path proving `address` is in the tree.
    ///
    /// Fails with [`AllowlistError::NotFound`] when the address' leaf is
    /// absent — the caller-facing "you are not on the allowlist" case.
    pub fn prove(&self, address: &Address) -> Result<MerkleProof, AllowlistError> {
        let leaf = leaf_hash(address);
        let mut index = self.levels[0]
            .binary_search(&leaf)
            .map_err(|_| AllowlistError::NotFound(*address))?;

        let mut siblings = Vec::with_capacity(self.levels.len() - 1);
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = index ^ 1;
            // The odd carry-forward has no sibling at this level.
            if sibling < level.len() {
                siblings.push(level[sibling]);
            }
            index /= 2;
        }

        Ok(MerkleProof { siblings })
    }
}

/// Sibling path from a leaf to just below the root.
///
/// Pairing order is implicit in the sorted pair hash, so the proof is just
/// the digests. A proof is only meaningful for the address it was generated
/// for, against the root of the tree that produced it — after a rebuild,
/// proofs must be regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub siblings: Vec<B256>,
}

impl MerkleProof {
    /// Recompute the root from `address` and compare with `expected_root`.
    ///
    /// Consults nothing but the proof itself. A tampered proof and a root
    /// that has since been replaced both come back `false`; there is no
    /// partial-trust outcome.
    pub fn verify(&self, address: &Address, expected_root: B256) -> bool {
        let mut current = leaf_hash(address);
        for sibling in &self.siblings {
            current = hash_pair(&current, sibling);
        }
        current == expected_root
    }
}
