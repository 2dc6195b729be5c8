//! Escrow order manager
//!
//! Fixed bindings from order operations to the methods of one deployed escrow
//! contract. The manager keeps no state: every answer comes from the ledger,
//! which also enforces who may move an order and when.

use super::order::{address_value, u64_value, uint_value};
use super::{EscrowError, Order, OrderStatus, OrderUpdate};
use crate::contract::Interface;
use crate::core::{CallOutput, Receipt, Transaction};
use crate::crypto::{format_address, Identity};
use crate::ledger::LedgerClient;
use ethers::types::{Address, U256};
use futures::future::try_join_all;
use serde_json::{json, Value};
use std::sync::Arc;

const EVENT_CREATED: &str = "OrderCreated";
const EVENT_CONFIRMED: &str = "OrderConfirmed";
const EVENT_CANCELLED: &str = "OrderCancelled";

pub struct EscrowOrderManager {
    client: Arc<LedgerClient>,
    interface: Arc<Interface>,
    contract: Address,
    gas: Option<U256>,
    gas_price: Option<U256>,
}

impl EscrowOrderManager {
    pub fn new(client: Arc<LedgerClient>, interface: Arc<Interface>, contract: Address) -> Self {
        Self {
            client,
            interface,
            contract,
            gas: None,
            gas_price: None,
        }
    }

    pub fn with_gas(mut self, gas: Option<U256>, gas_price: Option<U256>) -> Self {
        self.gas = gas;
        self.gas_price = gas_price;
        self
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    pub async fn order_count(&self) -> Result<u64, EscrowError> {
        let output = self.evaluate("getNumberOfOrders", &[]).await?;
        u64_value(output.get(0), "getNumberOfOrders", "order count")
    }

    pub async fn order(&self, index: u64) -> Result<Order, EscrowError> {
        const METHOD: &str = "getOrder";
        let output = self.evaluate(METHOD, &[json!(index)]).await?;
        let status = u64_value(output.get(3), METHOD, "status")?;

        Ok(Order {
            index,
            car_id: u64_value(output.get(0), METHOD, "carId")?,
            buyer_address: address_value(output.get(1), METHOD, "buyerAddress")?,
            value: uint_value(output.get(2), METHOD, "value")?,
            status: OrderStatus::from_code(status)?,
        })
    }

    pub async fn order_indices_by_buyer(&self, buyer: Address) -> Result<Vec<u64>, EscrowError> {
        const METHOD: &str = "getOrderIndicesByBuyer";
        let output = self
            .evaluate(METHOD, &[json!(format_address(&buyer))])
            .await?;

        let indices = output
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| EscrowError::UnexpectedResult {
                method: METHOD.to_string(),
                message: "expected a list of indices".to_string(),
            })?;
        indices
            .iter()
            .map(|index| u64_value(Some(index), METHOD, "index"))
            .collect()
    }

    /// Place an order for a car, moving `value` from the buyer into escrow
    pub async fn create_order(
        &self,
        car_id: u64,
        value: U256,
        buyer: Identity,
    ) -> Result<Order, EscrowError> {
        let receipt = self
            .submit("createOrder", &[json!(car_id)], value, buyer)
            .await?;
        let event = receipt
            .event(EVENT_CREATED)
            .ok_or_else(|| EscrowError::MissingEvent(EVENT_CREATED.to_string()))?;

        let order = Order {
            index: u64_value(event.field("index"), EVENT_CREATED, "index")?,
            car_id: u64_value(event.field("carId"), EVENT_CREATED, "carId")?,
            buyer_address: address_value(event.field("buyerAddress"), EVENT_CREATED, "buyerAddress")?,
            value: uint_value(event.field("value"), EVENT_CREATED, "value")?,
            status: OrderStatus::Pending,
        };
        log::info!(
            "Order {} created for car {} by {}",
            order.index,
            order.car_id,
            format_address(&order.buyer_address)
        );
        Ok(order)
    }

    /// Buyer accepts delivery; the escrowed value goes to the seller
    pub async fn confirm_order(&self, index: u64, buyer: Identity) -> Result<OrderUpdate, EscrowError> {
        let receipt = self
            .submit("confirmOrder", &[json!(index)], U256::zero(), buyer)
            .await?;
        self.update_from(&receipt, EVENT_CONFIRMED, OrderStatus::Succeeded)
    }

    /// Seller withdraws; the buyer is refunded plus `compensation`
    pub async fn cancel_order(
        &self,
        index: u64,
        compensation: U256,
        seller: Identity,
    ) -> Result<OrderUpdate, EscrowError> {
        let receipt = self
            .submit("cancelOrder", &[json!(index)], compensation, seller)
            .await?;
        self.update_from(&receipt, EVENT_CANCELLED, OrderStatus::Cancelled)
    }

    /// Value currently held by the contract, in wei
    pub async fn escrow_balance(&self) -> Result<U256, EscrowError> {
        let output = self.evaluate("getContractBalance", &[]).await?;
        uint_value(output.get(0), "getContractBalance", "balance")
    }

    pub async fn seller_address(&self) -> Result<Address, EscrowError> {
        let output = self.evaluate("seller", &[]).await?;
        address_value(output.get(0), "seller", "seller")
    }

    /// Every order, in index order
    pub async fn all_orders(&self) -> Result<Vec<Order>, EscrowError> {
        let count = self.order_count().await?;
        self.orders_at((0..count).collect()).await
    }

    /// The orders placed by `buyer`, in the order the ledger lists them
    pub async fn orders_by_buyer(&self, buyer: Address) -> Result<Vec<Order>, EscrowError> {
        let indices = self.order_indices_by_buyer(buyer).await?;
        self.orders_at(indices).await
    }

    /// The order, if it can still be confirmed or cancelled.
    ///
    /// The ledger has the final say; this only saves a doomed submission.
    pub async fn pending_order(&self, index: u64) -> Result<Order, EscrowError> {
        let order = self.order(index).await?;
        if !order.status.is_pending() {
            return Err(EscrowError::OrderNotPending {
                index,
                status: order.status,
            });
        }
        Ok(order)
    }

    async fn orders_at(&self, indices: Vec<u64>) -> Result<Vec<Order>, EscrowError> {
        try_join_all(indices.into_iter().map(|index| self.order(index))).await
    }

    fn update_from(
        &self,
        receipt: &Receipt,
        event_name: &str,
        status: OrderStatus,
    ) -> Result<OrderUpdate, EscrowError> {
        let event = receipt
            .event(event_name)
            .ok_or_else(|| EscrowError::MissingEvent(event_name.to_string()))?;
        let index = u64_value(event.field("index"), event_name, "index")?;
        log::info!("Order {} is now {}", index, status);
        Ok(OrderUpdate { index, status })
    }

    async fn evaluate(&self, method: &str, args: &[Value]) -> Result<CallOutput, EscrowError> {
        let output = Transaction::method_call(self.interface.clone(), self.contract, method, args)?
            .gas(self.gas)
            .gas_price(self.gas_price)
            .evaluate(&self.client)
            .await?;
        Ok(output)
    }

    async fn submit(
        &self,
        method: &str,
        args: &[Value],
        value: U256,
        signer: Identity,
    ) -> Result<Receipt, EscrowError> {
        let receipt = Transaction::method_call(self.interface.clone(), self.contract, method, args)?
            .gas(self.gas)
            .gas_price(self.gas_price)
            .value(value)
            .signer(signer)
            .submit(&self.client)
            .await?;
        Ok(receipt)
    }
}
