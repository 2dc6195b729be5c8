//! Ledger client: provider plus ephemeral signer registry
//!
//! The client holds no persistent signing material. Keys appear in its
//! wallet only while a submission holds a lease on them.

use super::{HttpTransport, LedgerError, RpcTransport};
use crate::wallet::Wallet;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256, U64};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;

/// Tunables for a ledger client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Chain id to sign for; asked from the node when absent
    pub chain_id: Option<u64>,
    /// Delay between receipt polls
    pub poll_interval: Duration,
    /// How long to wait for inclusion before reporting a timeout
    pub receipt_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            chain_id: None,
            poll_interval: Duration::from_millis(500),
            receipt_timeout: Duration::from_secs(120),
        }
    }
}

/// Log entry attached to a receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcLog {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<H256>,
    #[serde(default)]
    pub data: Bytes,
}

/// The parts of a transaction receipt this crate relies on
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: H256,
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// 1 on success, 0 when reverted. Absent on pre-byzantium nodes.
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub logs: Vec<RpcLog>,
}

/// Summary of the connected network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub network_id: String,
    pub chain_id: u64,
    pub block_number: u64,
}

/// Provider and signer handed to every transaction
pub struct LedgerClient {
    transport: Arc<dyn RpcTransport>,
    wallet: Wallet,
    settings: ClientSettings,
    chain_id: OnceCell<u64>,
}

impl LedgerClient {
    pub fn new(transport: Arc<dyn RpcTransport>, settings: ClientSettings) -> Self {
        Self {
            transport,
            wallet: Wallet::new(),
            settings,
            chain_id: OnceCell::new(),
        }
    }

    /// Client over HTTP JSON-RPC
    pub fn http(
        endpoint: &str,
        request_timeout: Duration,
        settings: ClientSettings,
    ) -> Result<Self, LedgerError> {
        let transport = HttpTransport::new(endpoint, request_timeout)?;
        Ok(Self::new(Arc::new(transport), settings))
    }

    /// The signer registry submissions lease keys from
    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Chain id to sign for, asked from the node once if not configured
    pub async fn chain_id(&self) -> Result<u64, LedgerError> {
        if let Some(id) = self.settings.chain_id {
            return Ok(id);
        }

        let id = self
            .chain_id
            .get_or_try_init(|| async {
                let id: U64 = self.request("eth_chainId", json!([])).await?;
                Ok::<u64, LedgerError>(id.as_u64())
            })
            .await?;
        Ok(*id)
    }

    /// Evaluate a request against the latest state without submitting it
    pub async fn call(&self, tx: &TransactionRequest) -> Result<Bytes, LedgerError> {
        let request = serde_json::to_value(tx)
            .map_err(|e| LedgerError::invalid_response("eth_call", e))?;
        self.request("eth_call", json!([request, "latest"])).await
    }

    /// Next nonce for an account, counting pending transactions
    pub async fn transaction_count(&self, address: Address) -> Result<U256, LedgerError> {
        self.request("eth_getTransactionCount", json!([address, "pending"]))
            .await
    }

    pub async fn gas_price(&self) -> Result<U256, LedgerError> {
        self.request("eth_gasPrice", json!([])).await
    }

    pub async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256, LedgerError> {
        let request = serde_json::to_value(tx)
            .map_err(|e| LedgerError::invalid_response("eth_estimateGas", e))?;
        self.request("eth_estimateGas", json!([request])).await
    }

    pub async fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        self.request("eth_getBalance", json!([address, "latest"]))
            .await
    }

    pub async fn network_info(&self) -> Result<NetworkInfo, LedgerError> {
        let network_id: String = self.request("net_version", json!([])).await?;
        let chain_id = self.chain_id().await?;
        let block_number: U64 = self.request("eth_blockNumber", json!([])).await?;

        Ok(NetworkInfo {
            network_id,
            chain_id,
            block_number: block_number.as_u64(),
        })
    }

    /// Sign a request with a key leased in the wallet, broadcast it and wait
    /// until it is included.
    ///
    /// A reverted receipt is reported as a rejection. A timeout does not mean
    /// the transaction will not be included.
    pub async fn send_transaction(
        &self,
        mut tx: TransactionRequest,
    ) -> Result<RpcReceipt, LedgerError> {
        let from = tx
            .from
            .ok_or_else(|| LedgerError::Authentication("transaction has no sender".to_string()))?;

        if !self.wallet.has_signer(&from) {
            return Err(LedgerError::Authentication(format!(
                "no signing key registered for {:?}",
                from
            )));
        }

        if tx.chain_id.is_none() {
            tx.chain_id = Some(U64::from(self.chain_id().await?));
        }
        if tx.nonce.is_none() {
            tx.nonce = Some(self.transaction_count(from).await?);
        }
        if tx.gas_price.is_none() {
            tx.gas_price = Some(self.gas_price().await?);
        }
        if tx.gas.is_none() {
            tx.gas = Some(self.estimate_gas(&tx).await?);
        }

        let typed = TypedTransaction::Legacy(tx);
        let raw = self
            .wallet
            .sign_transaction(&typed)
            .map_err(|e| LedgerError::Authentication(e.to_string()))?;

        let hash: H256 = self
            .request("eth_sendRawTransaction", json!([raw]))
            .await?;
        log::info!("Submitted transaction {:?}", hash);

        let receipt = self.wait_for_receipt(hash).await?;
        if receipt.status == Some(U64::zero()) {
            return Err(LedgerError::Rejected {
                code: None,
                message: format!("transaction {:?} reverted", hash),
            });
        }
        Ok(receipt)
    }

    /// Poll for a receipt until the configured timeout elapses
    pub async fn wait_for_receipt(&self, hash: H256) -> Result<RpcReceipt, LedgerError> {
        let started = Instant::now();
        let deadline = started + self.settings.receipt_timeout;

        loop {
            let value = self
                .transport
                .request("eth_getTransactionReceipt", json!([hash]))
                .await?;

            if !value.is_null() {
                return decode("eth_getTransactionReceipt", value);
            }

            if Instant::now() >= deadline {
                return Err(LedgerError::Timeout {
                    what: format!("receipt of {:?}", hash),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LedgerError> {
        let value = self.transport.request(method, params).await?;
        decode(method, value)
    }
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, LedgerError> {
    serde_json::from_value(value).map_err(|e| LedgerError::invalid_response(method, e))
}
