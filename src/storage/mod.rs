//! Storage module for artifacts, deployment records and catalog data

pub mod catalog;
pub mod persistence;

pub use catalog::{Car, CarCatalog, CatalogError};
pub use persistence::{load_json, save_json, DeploymentRecord, StorageError};
