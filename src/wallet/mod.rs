//! Wallet module for transient signing keys

pub mod wallet;

pub use wallet::{SignerGuard, Wallet, WalletError};
