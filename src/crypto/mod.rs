//! Cryptographic utilities for ledger accounts
//!
//! This module provides:
//! - Keccak-256 hashing, function selectors and event topics
//! - secp256k1 signing keys and address derivation

pub mod hash;
pub mod keys;

pub use hash::{event_topic, function_selector, keccak256};
pub use keys::{
    format_address, parse_address, public_key_to_address, AccountCredentials, Identity, KeyError,
    SigningKey,
};
