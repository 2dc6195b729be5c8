//! Ephemeral signer registry
//!
//! Keys are registered for the duration of one submission and removed again
//! when the returned guard is dropped, whether the submission succeeded,
//! failed or was cancelled.

use crate::crypto::{format_address, KeyError, SigningKey};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("No signing key registered for {0}")]
    NoSigner(String),
    #[error("Transaction has no sender")]
    MissingSender,
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// In-memory set of signing keys, each held under its own lease.
///
/// Concurrent submissions each get a distinct lease, so one guard going out
/// of scope never removes a key another submission still needs.
#[derive(Default)]
pub struct Wallet {
    signers: Mutex<HashMap<u64, SigningKey>>,
    next_lease: AtomicU64,
    registrations: AtomicU64,
}

impl Wallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key until the returned guard is dropped
    pub fn register(&self, key: SigningKey) -> SignerGuard<'_> {
        let lease = self.next_lease.fetch_add(1, Ordering::SeqCst);
        let address = key.address();
        self.lock().insert(lease, key);
        self.registrations.fetch_add(1, Ordering::SeqCst);

        log::debug!("Registered signer {} (lease {})", format_address(&address), lease);

        SignerGuard {
            wallet: self,
            lease,
            address,
        }
    }

    /// Sign a transaction with a registered key for its sender.
    ///
    /// Returns the RLP encoding of the signed transaction.
    pub fn sign_transaction(&self, tx: &TypedTransaction) -> Result<Bytes, WalletError> {
        let from = *tx.from().ok_or(WalletError::MissingSender)?;
        let chain_id = tx.chain_id().map(|id| id.as_u64());
        let sighash = tx.sighash();

        let signers = self.lock();
        let key = signers
            .values()
            .find(|key| key.address() == from)
            .ok_or_else(|| WalletError::NoSigner(format_address(&from)))?;

        let signature = key.sign_hash(sighash, chain_id)?;
        Ok(tx.rlp_signed(&signature))
    }

    /// Whether a key for this address is currently registered
    pub fn has_signer(&self, address: &Address) -> bool {
        self.lock().values().any(|key| key.address() == *address)
    }

    /// Number of keys currently registered
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Total number of registrations since creation
    pub fn registrations(&self) -> u64 {
        self.registrations.load(Ordering::SeqCst)
    }

    fn release(&self, lease: u64) {
        if let Some(key) = self.lock().remove(&lease) {
            log::debug!(
                "Released signer {} (lease {})",
                format_address(&key.address()),
                lease
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, SigningKey>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.signers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Lease on a registered key; dropping it removes the key
pub struct SignerGuard<'a> {
    wallet: &'a Wallet,
    lease: u64,
    address: Address,
}

impl SignerGuard<'_> {
    /// Address of the registered key
    pub fn address(&self) -> Address {
        self.address
    }
}

impl Drop for SignerGuard<'_> {
    fn drop(&mut self) {
        self.wallet.release(self.lease);
    }
}
