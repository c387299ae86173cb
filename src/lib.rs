//! Merkle allowlist commitments for the members badge contracts.
//!
//! Builds a keccak256 Merkle tree over the allowlisted claimer addresses,
//! derives the single root the badge contracts store on-chain, and generates
//! the sibling-path proofs a claimer later submits with `claim`.
//!
//! Pair hashes are sorted before concatenation, so proofs carry no
//! left/right flags. The combine rule must stay bit-identical to the
//! on-chain `MerkleProof.verify` implementation — any drift silently
//! invalidates every proof.
//!
//! The deploy-time (publish root) and claim-time (prove membership) call
//! sites both go through [`AllowlistCoordinator`], so the tree is only ever
//! built by one piece of code.

pub mod adapters;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod ports;

pub use coordinator::{AllowlistCoordinator, CoordinatorError};
pub use domain::identity::{encode_identity, leaf_hash, IDENTITY_LEN};
pub use domain::merkle::{AllowlistError, AllowlistTree, MerkleProof};
