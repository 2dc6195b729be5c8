//! Exact monetary amounts
//!
//! Amounts are integers of the smallest unit (wei). Ether strings are
//! validated here and converted by `ethers::utils`, never through floating
//! point.

use ethers::types::U256;
use thiserror::Error;

/// Decimal places between ether and wei
pub const ETHER_DECIMALS: usize = 18;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Value must be a non-negative integer: {0}")]
    NotAnInteger(String),
    #[error("Invalid ether amount: {0}")]
    InvalidAmount(String),
    #[error("Amount out of range: {0}")]
    Overflow(String),
}

/// Parse a wei amount given as decimal digits. Empty input means zero.
pub fn parse_wei(text: &str) -> Result<U256, UnitsError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(U256::zero());
    }
    if !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(UnitsError::NotAnInteger(text.to_string()));
    }
    U256::from_dec_str(text).map_err(|_| UnitsError::Overflow(text.to_string()))
}

/// Parse an ether amount such as `1.2` into wei.
///
/// Only plain decimals are accepted; anything finer than one wei is an error
/// rather than being truncated.
pub fn parse_ether(text: &str) -> Result<U256, UnitsError> {
    let text = text.trim();
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));

    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty())
        || !digits_only(whole)
        || !digits_only(fraction)
        || fraction.len() > ETHER_DECIMALS
    {
        return Err(UnitsError::InvalidAmount(text.to_string()));
    }

    let normalized = format!(
        "{}.{}",
        if whole.is_empty() { "0" } else { whole },
        if fraction.is_empty() { "0" } else { fraction }
    );
    ethers::utils::parse_ether(normalized).map_err(|_| UnitsError::Overflow(text.to_string()))
}

/// Parse an amount with an optional unit: `1.5`, `1.5 ether` or `100 wei`.
/// A bare number is in ether.
pub fn parse_amount(text: &str) -> Result<U256, UnitsError> {
    let text = text.trim();
    let split = text
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    if number.trim().is_empty() {
        return Err(UnitsError::InvalidAmount(text.to_string()));
    }

    match unit.to_ascii_lowercase().as_str() {
        "" | "eth" | "ether" => parse_ether(number),
        "wei" => parse_wei(number),
        _ => Err(UnitsError::InvalidAmount(text.to_string())),
    }
}

/// Format wei as ether without trailing zeros
pub fn format_ether(wei: U256) -> String {
    match ethers::utils::format_units(wei, "ether") {
        Ok(text) if text.contains('.') => text
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
        Ok(text) => text,
        Err(e) => {
            log::warn!("Cannot format {} wei as ether: {}", wei, e);
            format!("{} wei", wei)
        }
    }
}
