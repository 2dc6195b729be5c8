//! Ledger access over JSON-RPC
//!
//! This module provides:
//! - The `RpcTransport` seam and its HTTP implementation
//! - `LedgerClient`, which signs with leased keys and waits for receipts

pub mod client;
pub mod error;
pub mod transport;

pub use client::{ClientSettings, LedgerClient, NetworkInfo, RpcLog, RpcReceipt};
pub use error::LedgerError;
pub use transport::{HttpTransport, RpcTransport};
