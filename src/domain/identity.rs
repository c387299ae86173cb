use alloy::primitives::{keccak256, Address, B256};

use super::merkle::AllowlistError;

/// Byte width of an identity — an Ethereum account address.
pub const IDENTITY_LEN: usize = 20;

/// Hash an allowlisted address into its tree leaf: `keccak256(address)`.
///
/// The input is the 20 raw address bytes, never a hex string. Textual
/// variants of the same account (checksummed, lowercase) must be parsed
/// into an [`Address`] before hashing so they map to the same leaf —
/// parsing happens once, at config/CLI deserialization.
pub fn leaf_hash(address: &Address) -> B256 {
    keccak256(address.as_slice())
}

/// Encode an identity supplied as raw bytes.
///
/// Rejects anything that is not exactly [`IDENTITY_LEN`] bytes wide before
/// any hashing happens.
pub fn encode_identity(bytes: &[u8]) -> Result<B256, AllowlistError> {
    if bytes.len() != IDENTITY_LEN {
        return Err(AllowlistError::InvalidIdentityLength {
            expected: IDENTITY_LEN,
            got: bytes.len(),
        });
    }
    Ok(keccak256(bytes))
}
