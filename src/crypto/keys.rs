//! ECDSA key management for ledger accounts
//!
//! Provides signing key parsing and generation, account address derivation
//! and recoverable signatures over transaction hashes, using the secp256k1
//! elliptic curve.

use ethers::types::{Address, Signature, H256, U256};
use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use super::hash::keccak256;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid signing key")]
    InvalidSigningKey,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Signing key does not match address {0}")]
    AddressMismatch(String),
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A secret key able to authorize requests for one account.
///
/// The secret is erased when the key is dropped. `Debug` never prints it.
pub struct SigningKey {
    secret_key: SecretKey,
    address: Address,
}

impl SigningKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, _) = secp.generate_keypair(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    /// Create a key from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            address: public_key_to_address(&public_key),
        }
    }

    /// Parse a hex-encoded private key, with or without the `0x` prefix
    pub fn from_hex(hex_key: &str) -> Result<Self, KeyError> {
        let trimmed = hex_key.trim();
        let digits = strip_hex_prefix(trimmed);
        let mut bytes = hex::decode(digits).map_err(|_| KeyError::InvalidSigningKey)?;
        let parsed = SecretKey::from_slice(&bytes);
        bytes.zeroize();
        parsed
            .map(Self::from_secret_key)
            .map_err(|_| KeyError::InvalidSigningKey)
    }

    /// The account address this key signs for
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the private key as a 0x-prefixed hex string
    /// WARNING: Keep this secret!
    pub fn private_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.secret_key.secret_bytes()))
    }

    /// Sign a 32-byte hash, producing `v` per EIP-155 when a chain id is given
    pub fn sign_hash(&self, hash: H256, chain_id: Option<u64>) -> Result<Signature, KeyError> {
        let secp = Secp256k1::new();
        let message = Message::from_digest_slice(hash.as_bytes())?;
        let (recovery_id, compact) = secp
            .sign_ecdsa_recoverable(&message, &self.secret_key)
            .serialize_compact();

        let parity = recovery_id.to_i32() as u64;
        let v = match chain_id {
            Some(id) => parity + 35 + id * 2,
            None => parity + 27,
        };

        Ok(Signature {
            r: U256::from_big_endian(&compact[..32]),
            s: U256::from_big_endian(&compact[32..]),
            v,
        })
    }
}

impl Drop for SigningKey {
    fn drop(&mut self) {
        self.secret_key.non_secure_erase();
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("address", &format_address(&self.address))
            .finish_non_exhaustive()
    }
}

/// An account address paired with the key that signs for it
#[derive(Debug)]
pub struct Identity {
    address: Address,
    key: SigningKey,
}

impl Identity {
    /// Parse an address and a private key, requiring that the key derives the address
    pub fn new(address: &str, private_key: &str) -> Result<Self, KeyError> {
        let address = parse_address(address)?;
        let key = SigningKey::from_hex(private_key)?;
        Self::from_parts(address, key)
    }

    /// Pair an already parsed address and key
    pub fn from_parts(address: Address, key: SigningKey) -> Result<Self, KeyError> {
        if key.address() != address {
            return Err(KeyError::AddressMismatch(format_address(&address)));
        }
        Ok(Self { address, key })
    }

    /// Identity for the address derived from the key
    pub fn from_key(key: SigningKey) -> Self {
        Self {
            address: key.address(),
            key,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Hand the key over, e.g. to a transaction about to be submitted
    pub fn into_key(self) -> SigningKey {
        self.key
    }
}

/// A configured account kept as text until a signature is needed.
///
/// Every call to `identity` parses a fresh key, so no parsed key outlives
/// the submission it was made for.
#[derive(Clone)]
pub struct AccountCredentials {
    address: String,
    private_key: Zeroizing<String>,
}

impl AccountCredentials {
    pub fn new(address: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            private_key: Zeroizing::new(private_key.into()),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn identity(&self) -> Result<Identity, KeyError> {
        Identity::new(&self.address, &self.private_key)
    }
}

impl fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Convert a public key to an account address (last 20 bytes of the keccak hash)
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    Address::from_slice(&hash[12..])
}

/// Parse a hex address.
///
/// All-lowercase and all-uppercase forms are accepted as is; mixed case must
/// carry a valid checksum.
pub fn parse_address(input: &str) -> Result<Address, KeyError> {
    let trimmed = input.trim();
    let digits = strip_hex_prefix(trimmed);

    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(KeyError::InvalidAddress(trimmed.to_string()));
    }

    let address = Address::from_str(digits)
        .map_err(|_| KeyError::InvalidAddress(trimmed.to_string()))?;

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && format_address(&address)[2..] != *digits {
        return Err(KeyError::InvalidAddress(format!(
            "{} (bad checksum)",
            trimmed
        )));
    }

    Ok(address)
}

/// Mixed-case checksummed form of an address
pub fn format_address(address: &Address) -> String {
    ethers::utils::to_checksum(address, None)
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}
