//! Ledger transactions
//!
//! A transaction either deploys a contract or calls one method of a deployed
//! contract. Arguments are validated and encoded when the transaction is
//! built, so malformed input fails before any network round trip.
//!
//! - `submit` signs with a key leased to the client wallet for the duration
//!   of the call, waits for inclusion and decodes the emitted events.
//! - `evaluate` runs a read-only call against the latest state. It never
//!   touches the wallet.

use crate::contract::{AbiError, Interface, MethodDescriptor};
use crate::crypto::{format_address, Identity, KeyError, SigningKey};
use crate::ledger::{LedgerClient, LedgerError, RpcLog, RpcReceipt};
use ethers::abi::Token;
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("{0}")]
    Abi(#[from] AbiError),
    #[error("{0}")]
    Ledger(#[from] LedgerError),
    #[error("{0}")]
    Key(#[from] KeyError),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("Authentication error: {0}")]
    Authentication(String),
    #[error("Invalid byte code: {0}")]
    InvalidByteCode(String),
    #[error("Invalid receipt: {0}")]
    InvalidReceipt(String),
}

impl TransactionError {
    /// Only connectivity failures may be retried, and only by the operator
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransactionError::Ledger(e) if e.is_retryable())
    }
}

// =============================================================================
// Transaction Kinds
// =============================================================================

/// What a transaction does
#[derive(Debug, Clone)]
pub enum TransactionKind {
    /// Create a contract; there is no target address
    Deployment {
        byte_code: Bytes,
        constructor_args: Bytes,
    },
    /// Call one method of a deployed contract
    MethodCall {
        to: Address,
        method: MethodDescriptor,
        args: Vec<Token>,
    },
}

impl TransactionKind {
    pub fn to(&self) -> Option<Address> {
        match self {
            TransactionKind::Deployment { .. } => None,
            TransactionKind::MethodCall { to, .. } => Some(*to),
        }
    }

    /// Request payload: byte code plus constructor arguments, or selector
    /// plus method arguments
    pub fn data(&self) -> Result<Bytes, TransactionError> {
        match self {
            TransactionKind::Deployment {
                byte_code,
                constructor_args,
            } => {
                let mut data = byte_code.to_vec();
                data.extend_from_slice(constructor_args);
                Ok(Bytes::from(data))
            }
            TransactionKind::MethodCall { method, args, .. } => {
                Ok(Bytes::from(method.call_data(args)?))
            }
        }
    }
}

/// The frozen request produced when dispatch begins
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub gas: Option<U256>,
    pub gas_price: Option<U256>,
    pub value: U256,
    pub data: Bytes,
    pub nonce: Option<U256>,
}

impl PreparedRequest {
    pub fn to_request(&self) -> TransactionRequest {
        let mut request = TransactionRequest::new().value(self.value).data(self.data.clone());
        request.from = self.from;
        request.to = self.to.map(Into::into);
        request.gas = self.gas;
        request.gas_price = self.gas_price;
        request.nonce = self.nonce;
        request
    }
}

// =============================================================================
// Results
// =============================================================================

/// A decoded event emitted during a submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptEvent {
    pub name: String,
    pub fields: Map<String, Value>,
}

impl ReceiptEvent {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Confirmation of an included submission
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub transaction_hash: H256,
    /// Set for deployments: the created contract
    pub contract_address: Option<Address>,
    pub events: Vec<ReceiptEvent>,
}

impl Receipt {
    /// First event with this name
    pub fn event(&self, name: &str) -> Option<&ReceiptEvent> {
        self.events.iter().find(|e| e.name == name)
    }
}

/// Values returned by a read-only call, in output order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallOutput {
    values: Vec<(String, Value)>,
}

impl CallOutput {
    pub fn new(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[(String, Value)] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).map(|(_, v)| v)
    }

    pub fn named(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A deployment or method call with its sending parameters.
///
/// Fields may be adjusted until the transaction is dispatched; `submit`
/// consumes it.
pub struct Transaction {
    pub from: Option<Address>,
    pub gas: Option<U256>,
    pub gas_price: Option<U256>,
    pub value: U256,
    pub nonce: Option<U256>,
    signing_key: Option<SigningKey>,
    interface: Arc<Interface>,
    kind: TransactionKind,
}

impl Transaction {
    /// Deploy `byte_code` (hex, with or without `0x`) with constructor arguments
    pub fn deployment(
        interface: Arc<Interface>,
        byte_code: &str,
        args: &[Value],
    ) -> Result<Self, TransactionError> {
        let trimmed = byte_code.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(TransactionError::InvalidByteCode("empty".to_string()));
        }
        let code =
            hex::decode(digits).map_err(|e| TransactionError::InvalidByteCode(e.to_string()))?;

        let constructor_args = Bytes::from(interface.encode_constructor_args(args)?);

        Ok(Self::with_kind(
            interface,
            TransactionKind::Deployment {
                byte_code: Bytes::from(code),
                constructor_args,
            },
        ))
    }

    /// Call `method` of the contract at `to`
    pub fn method_call(
        interface: Arc<Interface>,
        to: Address,
        method: &str,
        args: &[Value],
    ) -> Result<Self, TransactionError> {
        let descriptor = interface.resolve(method, args.len())?.clone();
        let tokens = descriptor.encode_args(args)?;

        Ok(Self::with_kind(
            interface,
            TransactionKind::MethodCall {
                to,
                method: descriptor,
                args: tokens,
            },
        ))
    }

    fn with_kind(interface: Arc<Interface>, kind: TransactionKind) -> Self {
        Self {
            from: None,
            gas: None,
            gas_price: None,
            value: U256::zero(),
            nonce: None,
            signing_key: None,
            interface,
            kind,
        }
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn gas(mut self, gas: Option<U256>) -> Self {
        self.gas = gas;
        self
    }

    pub fn gas_price(mut self, gas_price: Option<U256>) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn nonce(mut self, nonce: Option<U256>) -> Self {
        self.nonce = nonce;
        self
    }

    /// Key used by the next `submit`, then dropped
    pub fn signing_key(mut self, key: SigningKey) -> Self {
        self.signing_key = Some(key);
        self
    }

    /// Sender address and signing key in one step
    pub fn signer(self, identity: Identity) -> Self {
        let from = identity.address();
        self.from(from).signing_key(identity.into_key())
    }

    /// Freeze the request as it will be sent
    pub fn prepare(&self) -> Result<PreparedRequest, TransactionError> {
        Ok(PreparedRequest {
            from: self.from,
            to: self.kind.to(),
            gas: self.gas,
            gas_price: self.gas_price,
            value: self.value,
            data: self.kind.data()?,
            nonce: self.nonce,
        })
    }

    /// Sign, broadcast and wait for inclusion.
    ///
    /// The signing key is registered with the client wallet only while the
    /// request is in flight and is removed on every exit path.
    pub async fn submit(mut self, client: &LedgerClient) -> Result<Receipt, TransactionError> {
        let request = self.prepare()?;

        let from = request.from.ok_or_else(|| {
            TransactionError::Authentication("no sending address given".to_string())
        })?;
        let key = self.signing_key.take().ok_or_else(|| {
            TransactionError::Authentication(format!(
                "no signing key for {}",
                format_address(&from)
            ))
        })?;
        if key.address() != from {
            return Err(TransactionError::Authentication(format!(
                "signing key does not match {}",
                format_address(&from)
            )));
        }

        let outcome = {
            let _signer = client.wallet().register(key);
            client.send_transaction(request.to_request()).await
        };
        let receipt = outcome?;

        self.build_receipt(receipt)
    }

    /// Run the call against the latest ledger state without submitting it
    pub async fn evaluate(&self, client: &LedgerClient) -> Result<CallOutput, TransactionError> {
        let method = match &self.kind {
            TransactionKind::Deployment { .. } => {
                return Err(TransactionError::Unsupported(
                    "a deployment cannot be evaluated".to_string(),
                ))
            }
            TransactionKind::MethodCall { method, .. } => method,
        };

        let request = self.prepare()?;
        let data = client.call(&request.to_request()).await?;
        Ok(CallOutput::new(method.decode_output(&data)?))
    }

    fn build_receipt(&self, receipt: RpcReceipt) -> Result<Receipt, TransactionError> {
        let contract_address = match self.kind {
            TransactionKind::Deployment { .. } => Some(receipt.contract_address.ok_or_else(|| {
                TransactionError::InvalidReceipt(format!(
                    "no contract address in receipt of {:?}",
                    receipt.transaction_hash
                ))
            })?),
            TransactionKind::MethodCall { .. } => None,
        };

        let mut events = Vec::new();
        for entry in &receipt.logs {
            if let Some(event) = self.decode_event(entry)? {
                events.push(event);
            }
        }

        Ok(Receipt {
            transaction_hash: receipt.transaction_hash,
            contract_address,
            events,
        })
    }

    fn decode_event(&self, entry: &RpcLog) -> Result<Option<ReceiptEvent>, TransactionError> {
        let Some(descriptor) = entry
            .topics
            .first()
            .and_then(|topic| self.interface.event_by_topic(topic))
        else {
            log::debug!("Skipping log with unknown topic from {:?}", entry.address);
            return Ok(None);
        };

        let fields = descriptor.decode_log(&entry.topics, &entry.data)?;
        Ok(Some(ReceiptEvent {
            name: descriptor.name.clone(),
            fields,
        }))
    }
}
