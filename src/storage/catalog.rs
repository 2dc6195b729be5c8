//! Car catalog
//!
//! Static reference data read from a flat JSON file. Quantities are advisory:
//! a car with quantity zero cannot be ordered, but the escrow contract does
//! not track stock.

use super::persistence::{load_json, StorageError};
use crate::core::units::{parse_ether, UnitsError};
use ethers::types::U256;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Could not find the car with ID {0}")]
    NotFound(u64),
    #[error("Car {0} is not available for purchase")]
    Unavailable(u64),
    #[error("Invalid price for car {car_id}: {source}")]
    InvalidPrice {
        car_id: u64,
        #[source]
        source: UnitsError,
    },
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub car_id: u64,
    #[serde(default)]
    pub name: String,
    /// Price in ether, kept as written
    #[serde(deserialize_with = "price_text")]
    pub price: String,
    pub quantity: u64,
}

impl Car {
    /// Price converted to wei
    pub fn price_wei(&self) -> Result<U256, CatalogError> {
        parse_ether(&self.price).map_err(|source| CatalogError::InvalidPrice {
            car_id: self.car_id,
            source,
        })
    }
}

/// Accept `"1.2"` as well as a bare `1.2`, keeping the literal digits
fn price_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a price, got {}",
            other
        ))),
    }
}

/// Cars loaded from a data file
#[derive(Debug, Clone)]
pub struct CarCatalog {
    cars: Vec<Car>,
}

impl CarCatalog {
    pub fn new(cars: Vec<Car>) -> Self {
        Self { cars }
    }

    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let cars: Vec<Car> = load_json(path).await?;
        log::debug!("Loaded {} cars from {}", cars.len(), path.display());
        Ok(Self::new(cars))
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn get(&self, car_id: u64) -> Option<&Car> {
        self.cars.iter().find(|car| car.car_id == car_id)
    }

    /// The car, if it exists and can be ordered
    pub fn available(&self, car_id: u64) -> Result<&Car, CatalogError> {
        let car = self.get(car_id).ok_or(CatalogError::NotFound(car_id))?;
        if car.quantity == 0 {
            return Err(CatalogError::Unavailable(car_id));
        }
        Ok(car)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CARS: &str = r#"[
        {"carId": 1, "name": "Roadster", "price": 1, "quantity": 2},
        {"carId": 2, "name": "Sedan", "price": 1.2, "quantity": 0},
        {"carId": 3, "name": "Coupe", "price": "0.75", "quantity": 1}
    ]"#;

    async fn catalog() -> (tempfile::TempDir, CarCatalog) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cars.json");
        std::fs::write(&path, CARS).unwrap();
        let catalog = CarCatalog::load(&path).await.unwrap();
        (dir, catalog)
    }

    #[tokio::test]
    async fn test_prices_are_exact() {
        let (_dir, catalog) = catalog().await;
        assert_eq!(catalog.cars().len(), 3);
        assert_eq!(catalog.get(2).unwrap().price, "1.2");
        assert_eq!(
            catalog.get(2).unwrap().price_wei().unwrap(),
            U256::from(1_200_000_000_000_000_000u64)
        );
        assert_eq!(
            catalog.get(3).unwrap().price_wei().unwrap(),
            U256::from(750_000_000_000_000_000u64)
        );
    }

    #[tokio::test]
    async fn test_availability() {
        let (_dir, catalog) = catalog().await;
        assert_eq!(catalog.available(1).unwrap().name, "Roadster");
        assert!(matches!(catalog.available(2), Err(CatalogError::Unavailable(2))));
        assert!(matches!(catalog.available(9), Err(CatalogError::NotFound(9))));
    }
}
