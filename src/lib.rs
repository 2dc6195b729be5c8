//! Contract-Escrow: compile, deploy and drive ledger contracts from Rust
//!
//! This crate provides a typed client for contracts on an EVM ledger:
//! - Contract compilation through an external compiler
//! - Interface descriptions with a per-type ABI encode/decode table
//! - Deployments and method calls, submitted with short-lived signing keys
//!   or evaluated read-only
//! - Run-time method dispatch from `name(args...)` commands
//! - An escrow order workflow for a car trading contract
//!
//! # Example
//!
//! ```no_run
//! use contract_escrow::crypto::SigningKey;
//! use contract_escrow::escrow::EscrowOrderManager;
//! use contract_escrow::ledger::{ClientSettings, LedgerClient};
//! use contract_escrow::storage::DeploymentRecord;
//! use contract_escrow::crypto::Identity;
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LedgerClient::http(
//!     "http://127.0.0.1:8545",
//!     Duration::from_secs(30),
//!     ClientSettings::default(),
//! )?;
//! let record = DeploymentRecord::load(Path::new("build/receipts/CarTrading.json")).await?;
//! let manager = EscrowOrderManager::new(
//!     Arc::new(client),
//!     Arc::new(record.interface_description.clone()),
//!     record.contract_address()?,
//! );
//!
//! let buyer = Identity::from_key(SigningKey::generate());
//! let order = manager.create_order(1, ethers::types::U256::exp10(18), buyer).await?;
//! println!("Order {} is {}", order.index, order.status);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod contract;
pub mod core;
pub mod crypto;
pub mod dispatch;
pub mod escrow;
pub mod ledger;
pub mod storage;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types
pub use contract::{CompilationResult, CompilationService, Interface, MethodDescriptor};
pub use crate::core::{Receipt, Transaction, TransactionError, TransactionKind};
pub use crypto::{Identity, SigningKey};
pub use dispatch::{MethodDispatcher, Session};
pub use escrow::{EscrowOrderManager, Order, OrderStatus};
pub use ledger::{LedgerClient, LedgerError};
