//! Keccak-256 hashing utilities
//!
//! Provides the hashes used for account addresses, function selectors and
//! event topics.

use ethers::types::H256;

/// Computes the Keccak-256 hash of the input data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    ethers::utils::keccak256(data)
}

/// First four bytes of the hash of a canonical function signature
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Topic identifying an event with the given canonical signature
pub fn event_topic(signature: &str) -> H256 {
    H256::from(keccak256(signature.as_bytes()))
}
