//! Escrow orders as seen from outside the contract

use super::EscrowError;
use crate::crypto::{format_address, parse_address};
use ethers::types::{Address, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Lifecycle of an order. `Pending` moves once, to either final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Succeeded,
    Cancelled,
}

impl OrderStatus {
    /// Status from its on-ledger enum code
    pub fn from_code(code: u64) -> Result<Self, EscrowError> {
        match code {
            0 => Ok(OrderStatus::Pending),
            1 => Ok(OrderStatus::Succeeded),
            2 => Ok(OrderStatus::Cancelled),
            other => Err(EscrowError::UnexpectedResult {
                method: "getOrder".to_string(),
                message: format!("unknown order status {}", other),
            }),
        }
    }

    pub fn is_pending(self) -> bool {
        self == OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Succeeded => "Succeeded",
            OrderStatus::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// One order held in escrow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub index: u64,
    pub car_id: u64,
    /// Value held in escrow, in wei
    #[serde(serialize_with = "wei_to_string", deserialize_with = "wei_from_string")]
    pub value: U256,
    #[serde(serialize_with = "address_to_string")]
    pub buyer_address: Address,
    pub status: OrderStatus,
}

/// New status of an order after confirm or cancel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub index: u64,
    pub status: OrderStatus,
}

fn wei_to_string<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn wei_from_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    let text = String::deserialize(deserializer)?;
    U256::from_dec_str(&text).map_err(serde::de::Error::custom)
}

fn address_to_string<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_address(address))
}

// Decoded call results carry integers as decimal strings and addresses as
// checksummed strings.

pub(crate) fn uint_value(value: Option<&Value>, method: &str, what: &str) -> Result<U256, EscrowError> {
    value
        .and_then(Value::as_str)
        .and_then(|s| U256::from_dec_str(s).ok())
        .ok_or_else(|| EscrowError::UnexpectedResult {
            method: method.to_string(),
            message: format!("{} is not an unsigned integer: {:?}", what, value),
        })
}

pub(crate) fn u64_value(value: Option<&Value>, method: &str, what: &str) -> Result<u64, EscrowError> {
    let number = uint_value(value, method, what)?;
    if number > U256::from(u64::MAX) {
        return Err(EscrowError::UnexpectedResult {
            method: method.to_string(),
            message: format!("{} out of range: {}", what, number),
        });
    }
    Ok(number.as_u64())
}

pub(crate) fn address_value(
    value: Option<&Value>,
    method: &str,
    what: &str,
) -> Result<Address, EscrowError> {
    value
        .and_then(Value::as_str)
        .and_then(|s| parse_address(s).ok())
        .ok_or_else(|| EscrowError::UnexpectedResult {
            method: method.to_string(),
            message: format!("{} is not an address: {:?}", what, value),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_wire_format() {
        let order = Order {
            index: 0,
            car_id: 1,
            value: U256::exp10(18),
            buyer_address: Address::repeat_byte(0xab),
            status: OrderStatus::Pending,
        };

        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["index"], json!(0));
        assert_eq!(value["carId"], json!(1));
        assert_eq!(value["value"], json!("1000000000000000000"));
        assert_eq!(value["status"], json!("Pending"));
        assert_eq!(
            value["buyerAddress"],
            json!(format_address(&Address::repeat_byte(0xab)))
        );

        let back: Order = serde_json::from_value(value).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(OrderStatus::from_code(1).unwrap(), OrderStatus::Succeeded);
        assert_eq!(OrderStatus::from_code(2).unwrap(), OrderStatus::Cancelled);
        assert!(OrderStatus::from_code(3).is_err());
        assert_eq!(OrderStatus::Cancelled.to_string(), "Cancelled");
    }

    #[test]
    fn test_result_conversions() {
        assert_eq!(u64_value(Some(&json!("42")), "m", "x").unwrap(), 42);
        assert!(u64_value(Some(&json!(42)), "m", "x").is_err());
        assert!(u64_value(Some(&json!("18446744073709551616")), "m", "x").is_err());
        assert!(address_value(Some(&json!("0x12")), "m", "x").is_err());
        assert!(uint_value(None, "m", "x").is_err());
    }
}
