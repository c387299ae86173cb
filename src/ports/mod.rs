pub mod chain;

use alloy::primitives::B256;

/// Minimal transaction receipt returned by chain adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub success: bool,
}
