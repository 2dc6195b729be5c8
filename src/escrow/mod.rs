//! Escrow orders over a deployed car trading contract
//!
//! A buyer deposits the price when placing an order. The buyer's
//! confirmation releases it to the seller; the seller's cancellation refunds
//! it with a compensation on top.

pub mod error;
pub mod manager;
pub mod order;

pub use error::EscrowError;
pub use manager::EscrowOrderManager;
pub use order::{Order, OrderStatus, OrderUpdate};
