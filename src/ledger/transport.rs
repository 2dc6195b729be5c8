//! JSON-RPC transport to the ledger node

use super::LedgerError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A request/response channel to the ledger
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Issue one JSON-RPC call and return its `result` member
    async fn request(&self, method: &str, params: Value) -> Result<Value, LedgerError>;
}

/// JSON-RPC 2.0 over HTTP POST
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Connectivity {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    fn connectivity(&self, err: reqwest::Error) -> LedgerError {
        if err.is_timeout() {
            LedgerError::Timeout {
                what: format!("response from {}", self.endpoint),
                waited_ms: self.timeout.as_millis() as u64,
            }
        } else {
            LedgerError::Connectivity {
                endpoint: self.endpoint.clone(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        log::debug!("RPC -> {} (id {})", method, id);

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.connectivity(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.connectivity(e))?;

        // Nodes may answer a rejection with an HTTP error status
        let body = match serde_json::from_str::<Value>(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(LedgerError::Connectivity {
                    endpoint: self.endpoint.clone(),
                    message: format!("HTTP {}", status),
                })
            }
            Err(e) => return Err(LedgerError::invalid_response(method, e)),
        };

        if let Some(error) = body.get("error") {
            return Err(rpc_error(error));
        }
        if !status.is_success() {
            return Err(LedgerError::Connectivity {
                endpoint: self.endpoint.clone(),
                message: format!("HTTP {}", status),
            });
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| LedgerError::invalid_response(method, "missing result"))
    }
}

/// Map a JSON-RPC error object to a rejection, keeping the node's message
fn rpc_error(error: &Value) -> LedgerError {
    let code = error.get("code").and_then(Value::as_i64);
    let mut message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();

    if let Some(data) = error.get("data").and_then(Value::as_str) {
        message = format!("{} ({})", message, data);
    }

    LedgerError::Rejected { code, message }
}
