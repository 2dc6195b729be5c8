//! Escrow error types

use super::OrderStatus;
use crate::core::TransactionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EscrowError {
    #[error("{0}")]
    Transaction(#[from] TransactionError),
    #[error("Order {index} is already completed ({status})")]
    OrderNotPending { index: u64, status: OrderStatus },
    #[error("Unexpected result from {method}: {message}")]
    UnexpectedResult { method: String, message: String },
    #[error("Receipt carries no {0} event")]
    MissingEvent(String),
}

impl EscrowError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EscrowError::Transaction(e) if e.is_retryable())
    }
}
