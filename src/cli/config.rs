//! Application configuration
//!
//! Loaded from a TOML file when one exists, then overridden from the
//! environment (a `.env` file is read first). Every field has a default, so
//! an empty file is a valid configuration.

use crate::crypto::AccountCredentials;
use crate::ledger::ClientSettings;
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "escrow.toml";

pub const ENV_RPC_ENDPOINT: &str = "LEDGER_RPC_ENDPOINT";
pub const ENV_DEFAULT_ADDRESS: &str = "LEDGER_DEFAULT_ADDRESS";
pub const ENV_DEFAULT_PRIVATE_KEY: &str = "LEDGER_DEFAULT_PRIVATE_KEY";
pub const ENV_CHAIN_ID: &str = "LEDGER_CHAIN_ID";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub contract: ContractConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint of the ledger node
    #[serde(default = "default_rpc_endpoint")]
    pub rpc_endpoint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How long to wait for a receipt, in seconds
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Asked from the node when not set
    #[serde(default)]
    pub chain_id: Option<u64>,

    /// Estimated per transaction when not set
    #[serde(default)]
    pub default_gas: Option<u64>,

    /// Asked from the node when not set
    #[serde(default)]
    pub default_gas_price: Option<u64>,
}

/// Account used when no other signer is given
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("address", &self.address)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Contract source file
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Contract to deploy out of the source
    #[serde(default = "default_contract_name")]
    pub name: String,

    #[serde(default)]
    pub constructor_args: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Compiled artifacts, one `<name>.json` per contract
    #[serde(default = "default_compile_dir")]
    pub compile_dir: PathBuf,

    /// Deployment records, one `<name>.json` per contract
    #[serde(default = "default_receipt_dir")]
    pub receipt_dir: PathBuf,

    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,

    #[serde(default = "default_solc")]
    pub solc: PathBuf,
}

fn default_rpc_endpoint() -> String {
    "http://127.0.0.1:8545".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_receipt_timeout() -> u64 {
    120
}
fn default_poll_interval() -> u64 {
    500
}
fn default_source() -> PathBuf {
    PathBuf::from("contracts/CarTrading.sol")
}
fn default_contract_name() -> String {
    "CarTrading".to_string()
}
fn default_compile_dir() -> PathBuf {
    PathBuf::from("build/compiled")
}
fn default_receipt_dir() -> PathBuf {
    PathBuf::from("build/receipts")
}
fn default_catalog() -> PathBuf {
    PathBuf::from("data/cars.json")
}
fn default_solc() -> PathBuf {
    PathBuf::from("solc")
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: default_rpc_endpoint(),
            request_timeout_secs: default_request_timeout(),
            receipt_timeout_secs: default_receipt_timeout(),
            poll_interval_ms: default_poll_interval(),
            chain_id: None,
            default_gas: None,
            default_gas_price: None,
        }
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            name: default_contract_name(),
            constructor_args: Vec::new(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            compile_dir: default_compile_dir(),
            receipt_dir: default_receipt_dir(),
            catalog: default_catalog(),
            solc: default_solc(),
        }
    }
}

impl AppConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load from `path`, or from the default file if present, then apply
    /// `.env` and environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                log::debug!("No configuration file, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Override fields from variables resolved by `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = set(ENV_RPC_ENDPOINT) {
            self.network.rpc_endpoint = endpoint;
        }
        if let Some(address) = set(ENV_DEFAULT_ADDRESS) {
            self.account.address = Some(address);
        }
        if let Some(key) = set(ENV_DEFAULT_PRIVATE_KEY) {
            self.account.private_key = Some(key);
        }
        if let Some(chain_id) = set(ENV_CHAIN_ID) {
            let parsed = chain_id
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    name: ENV_CHAIN_ID.to_string(),
                    value: chain_id.clone(),
                })?;
            self.network.chain_id = Some(parsed);
        }
        Ok(())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            chain_id: self.network.chain_id,
            poll_interval: Duration::from_millis(self.network.poll_interval_ms),
            receipt_timeout: Duration::from_secs(self.network.receipt_timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.request_timeout_secs)
    }

    pub fn gas(&self) -> Option<U256> {
        self.network.default_gas.map(U256::from)
    }

    pub fn gas_price(&self) -> Option<U256> {
        self.network.default_gas_price.map(U256::from)
    }

    /// The default account, when both its address and key are configured
    pub fn default_account(&self) -> Option<AccountCredentials> {
        match (&self.account.address, &self.account.private_key) {
            (Some(address), Some(key)) => Some(AccountCredentials::new(address, key)),
            _ => None,
        }
    }

    /// Where the deployment record of the configured contract lives
    pub fn record_path(&self) -> PathBuf {
        self.paths
            .receipt_dir
            .join(format!("{}.json", self.contract.name))
    }
}
