//! Record persistence
//!
//! Compiled artifacts and deployment records are stored as pretty JSON.
//! Writes go to a temporary file first and are moved into place with a
//! rename, so readers never see a half-written record.

use crate::contract::Interface;
use crate::crypto::{format_address, parse_address, KeyError};
use ethers::types::Address;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Serialize a value and atomically replace `path` with it
pub async fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bytes = serde_json::to_vec_pretty(value)?;

    // Write to temporary file first
    let temp_path = temp_path_for(path);
    tokio::fs::write(&temp_path, bytes).await?;

    // Atomic rename
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }

    Ok(())
}

/// Load a JSON record
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StorageError::InvalidData(format!(
                "{} not found",
                path.display()
            )))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&bytes)?)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// The minimum needed to talk to a deployed contract later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub address: String,
    pub interface_description: Interface,
}

impl DeploymentRecord {
    pub fn new(address: Address, interface_description: Interface) -> Self {
        Self {
            address: format_address(&address),
            interface_description,
        }
    }

    pub fn contract_address(&self) -> Result<Address, KeyError> {
        parse_address(&self.address)
    }

    pub async fn save(&self, path: &Path) -> Result<(), StorageError> {
        save_json(path, self).await
    }

    pub async fn load(path: &Path) -> Result<Self, StorageError> {
        let record: Self = load_json(path).await?;
        record
            .contract_address()
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_and_load_deployment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("receipts").join("CarTrading.json");
        let interface = Interface::from_value(json!([
            {"type": "function", "name": "seller", "constant": true, "payable": false,
             "inputs": [], "outputs": [{"name": "", "type": "address"}]}
        ]))
        .unwrap();

        let record = DeploymentRecord::new(Address::repeat_byte(0xab), interface);
        record.save(&path).await.unwrap();

        let loaded = DeploymentRecord::load(&path).await.unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.contract_address().unwrap(), Address::repeat_byte(0xab));
        assert!(!dir.path().join("receipts").join("CarTrading.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_record_field_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("record.json");
        DeploymentRecord::new(Address::zero(), Interface::default())
            .save(&path)
            .await
            .unwrap();

        let value: Value = load_json(&path).await.unwrap();
        assert_eq!(
            value,
            json!({
                "address": "0x0000000000000000000000000000000000000000",
                "interfaceDescription": []
            })
        );
    }

    #[tokio::test]
    async fn test_overwrite_replaces_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("value.json");
        save_json(&path, &json!({"n": 1})).await.unwrap();
        save_json(&path, &json!({"n": 2})).await.unwrap();

        let value: Value = load_json(&path).await.unwrap();
        assert_eq!(value["n"], json!(2));
    }

    #[tokio::test]
    async fn test_load_missing_and_invalid() {
        let dir = tempdir().unwrap();
        let missing = load_json::<Value>(&dir.path().join("missing.json")).await;
        assert!(matches!(missing, Err(StorageError::InvalidData(_))));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"address": "nope", "interfaceDescription": []}"#).unwrap();
        assert!(matches!(
            DeploymentRecord::load(&path).await,
            Err(StorageError::InvalidData(_))
        ));
    }
}
