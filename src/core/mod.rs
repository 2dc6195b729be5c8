//! Core components
//!
//! - Transactions (deployments and method calls, submit or evaluate)
//! - Units (exact wei and ether conversion)

pub mod transaction;
pub mod units;

pub use transaction::{
    CallOutput, PreparedRequest, Receipt, ReceiptEvent, Transaction, TransactionError,
    TransactionKind,
};
pub use units::{format_ether, parse_amount, parse_ether, parse_wei, UnitsError, ETHER_DECIMALS};
