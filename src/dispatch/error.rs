//! Dispatch error types

use crate::contract::AbiError;
use crate::core::{TransactionError, UnitsError};
use crate::crypto::KeyError;
use thiserror::Error;

/// Errors raised while turning a command line into a ledger request
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Command is empty.")]
    EmptyCommand,
    #[error("Invalid command structure: {0}")]
    InvalidCommand(String),
    #[error("{0}")]
    Abi(#[from] AbiError),
    #[error("{0}")]
    Format(#[from] UnitsError),
    #[error("{0}")]
    Key(#[from] KeyError),
    #[error("{0}")]
    Transaction(#[source] TransactionError),
    #[error("No default account configured; enter an address")]
    NoDefaultAccount,
    #[error("Input closed")]
    EndOfInput,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransactionError> for DispatchError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Abi(e) => DispatchError::Abi(e),
            other => DispatchError::Transaction(other),
        }
    }
}

impl DispatchError {
    /// Whether the same command may be tried again unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::Transaction(e) if e.is_retryable())
    }
}
