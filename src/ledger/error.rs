//! Ledger error types

use thiserror::Error;

/// Errors reported while talking to the ledger node
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    /// Endpoint unreachable or answered with a transport-level failure
    #[error("Connectivity error: {message} (endpoint: {endpoint})")]
    Connectivity { endpoint: String, message: String },

    /// Gave up waiting. The request may still be included later.
    #[error("Timed out after {waited_ms}ms waiting for {what}")]
    Timeout { what: String, waited_ms: u64 },

    /// The ledger refused the request or reverted it
    #[error("Transaction rejected: {message}")]
    Rejected { code: Option<i64>, message: String },

    /// No usable signer for the sending address
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid response to {method}: {message}")]
    InvalidResponse { method: String, message: String },
}

impl LedgerError {
    /// Whether an operator may retry the same request.
    ///
    /// Nothing in this crate retries automatically: resubmitting a
    /// state-changing request is not idempotent.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Connectivity { .. } => true,
            LedgerError::Timeout { .. } => true,
            LedgerError::Rejected { .. } => false,
            LedgerError::Authentication(_) => false,
            LedgerError::InvalidResponse { .. } => false,
        }
    }

    pub(crate) fn invalid_response(method: &str, message: impl ToString) -> Self {
        LedgerError::InvalidResponse {
            method: method.to_string(),
            message: message.to_string(),
        }
    }
}
