//! Command-line interface: configuration and command handlers

pub mod commands;
pub mod config;

pub use commands::*;
pub use config::{AppConfig, ConfigError};
