//! Run-time method dispatch over a deployed contract
//!
//! The interface description decides everything: whether a method exists,
//! how many arguments it takes, whether it is evaluated or submitted and
//! whether it accepts a value.

use super::{Command, DispatchError};
use crate::contract::{Interface, MethodDescriptor};
use crate::core::{parse_wei, CallOutput, Receipt, Transaction};
use crate::crypto::{format_address, AccountCredentials, Identity};
use crate::ledger::LedgerClient;
use async_trait::async_trait;
use ethers::types::{Address, U256};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Answers the questions a state-changing dispatch has to ask
#[async_trait]
pub trait InvocationContext: Send {
    /// Wei to send with a payable method, as decimal text. Empty means zero.
    async fn value(&mut self, method: &MethodDescriptor) -> Result<String, DispatchError>;

    /// Signer for the call; `None` selects the default account
    async fn identity(&mut self) -> Result<Option<Identity>, DispatchError>;
}

/// Context with fixed answers, for non-interactive use
#[derive(Debug, Default)]
pub struct PresetContext {
    value: Option<String>,
    identity: Option<Identity>,
}

impl PresetContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }
}

#[async_trait]
impl InvocationContext for PresetContext {
    async fn value(&mut self, _method: &MethodDescriptor) -> Result<String, DispatchError> {
        Ok(self.value.clone().unwrap_or_default())
    }

    async fn identity(&mut self) -> Result<Option<Identity>, DispatchError> {
        // One submission per identity
        Ok(self.identity.take())
    }
}

/// Resolves commands against one contract's interface and runs them
pub struct MethodDispatcher {
    client: Arc<LedgerClient>,
    interface: Arc<Interface>,
    contract: Address,
    gas: Option<U256>,
    gas_price: Option<U256>,
    default_account: Option<AccountCredentials>,
}

impl MethodDispatcher {
    pub fn new(client: Arc<LedgerClient>, interface: Arc<Interface>, contract: Address) -> Self {
        Self {
            client,
            interface,
            contract,
            gas: None,
            gas_price: None,
            default_account: None,
        }
    }

    pub fn with_gas(mut self, gas: Option<U256>, gas_price: Option<U256>) -> Self {
        self.gas = gas;
        self.gas_price = gas_price;
        self
    }

    pub fn with_default_account(mut self, account: AccountCredentials) -> Self {
        self.default_account = Some(account);
        self
    }

    pub fn client(&self) -> &LedgerClient {
        &self.client
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    /// Parse, resolve and run one command, returning the text to show.
    ///
    /// Unknown methods, arity mismatches and malformed arguments fail before
    /// any prompt or network call.
    pub async fn execute<C>(&self, line: &str, context: &mut C) -> Result<String, DispatchError>
    where
        C: InvocationContext + ?Sized,
    {
        let command = Command::parse(line)?;
        self.interface.method(&command.method)?;
        let args = command.args()?;
        let method = self.interface.resolve(&command.method, args.len())?.clone();

        let tx = Transaction::method_call(self.interface.clone(), self.contract, &command.method, &args)?
        .gas(self.gas)
        .gas_price(self.gas_price);

        if method.constant {
            log::debug!("Evaluating {}", command.method);
            let output = tx.evaluate(&self.client).await?;
            return Ok(render(&shape_output(&output)));
        }

        let value = if method.payable {
            parse_wei(&context.value(&method).await?)?
        } else {
            U256::zero()
        };

        let identity = match context.identity().await? {
            Some(identity) => identity,
            None => self.default_identity()?,
        };

        log::debug!(
            "Submitting {} from {}",
            command.method,
            format_address(&identity.address())
        );
        let receipt = tx.value(value).signer(identity).submit(&self.client).await?;
        Ok(format_receipt(&receipt))
    }

    fn default_identity(&self) -> Result<Identity, DispatchError> {
        let account = self
            .default_account
            .as_ref()
            .ok_or(DispatchError::NoDefaultAccount)?;
        Ok(account.identity()?)
    }
}

/// Call output as one JSON value, keyed by name where outputs are named
pub fn shape_output(output: &CallOutput) -> Value {
    match output.values() {
        [] => Value::Null,
        [(_, single)] => single.clone(),
        many => {
            let mut object = Map::new();
            for (position, (name, value)) in many.iter().enumerate() {
                let key = if name.is_empty() {
                    position.to_string()
                } else {
                    name.clone()
                };
                object.insert(key, value.clone());
            }
            Value::Object(object)
        }
    }
}

/// Strings print bare, everything else as compact JSON
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Transaction hash, event count and one line per decoded event
pub fn format_receipt(receipt: &Receipt) -> String {
    let mut lines = vec![format!("Transaction hash: {:?}", receipt.transaction_hash)];
    if let Some(address) = receipt.contract_address {
        lines.push(format!("Contract address: {}", format_address(&address)));
    }
    lines.push(format!("Events: {}", receipt.events.len()));
    for event in &receipt.events {
        lines.push(format!(
            "\t{}: {}",
            event.name,
            Value::Object(event.fields.clone())
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::AbiError;
    use crate::core::{TransactionError, UnitsError};
    use crate::ledger::LedgerError;
    use crate::test_utils::{escrow_interface, FakeLedger};
    use serde_json::json;

    async fn setup() -> (Arc<FakeLedger>, MethodDispatcher) {
        let ledger = Arc::new(FakeLedger::new());
        let client = Arc::new(LedgerClient::new(ledger.clone(), FakeLedger::settings()));
        let interface = Arc::new(escrow_interface());

        let receipt = Transaction::deployment(interface.clone(), FakeLedger::BYTE_CODE, &[])
            .unwrap()
            .signer(Identity::from_key(ledger.seller_key()))
            .submit(&client)
            .await
            .unwrap();
        let contract = receipt.contract_address.unwrap();

        let seller = ledger.seller_key();
        let dispatcher = MethodDispatcher::new(client, interface, contract).with_default_account(
            AccountCredentials::new(format_address(&seller.address()), seller.private_key_hex()),
        );
        (ledger, dispatcher)
    }

    fn buyer(ledger: &FakeLedger, i: u8) -> Identity {
        Identity::from_key(ledger.buyer_key(i))
    }

    #[tokio::test]
    async fn test_constant_dispatch_never_registers_a_key() {
        let (ledger, dispatcher) = setup().await;
        let wallet = dispatcher.client.wallet();
        let before = wallet.registrations();
        let sent = ledger.raw_transactions();

        let out = dispatcher
            .execute("getNumberOfOrders()", &mut PresetContext::new())
            .await
            .unwrap();

        assert_eq!(out, "0");
        assert_eq!(wallet.registrations(), before);
        assert_eq!(ledger.raw_transactions(), sent);
    }

    #[tokio::test]
    async fn test_submit_leaves_no_key_registered() {
        let (ledger, dispatcher) = setup().await;
        let wallet = dispatcher.client.wallet();

        let mut context = PresetContext::new()
            .with_value("1000000000000000000")
            .with_identity(buyer(&ledger, 0));
        let out = dispatcher.execute("createOrder(1)", &mut context).await.unwrap();
        assert!(out.starts_with("Transaction hash: 0x"));
        assert!(out.contains("Events: 1"));
        assert!(out.contains("\tOrderCreated: {\"index\":\"0\",\"carId\":\"1\""));
        assert!(wallet.is_empty());

        // Rejected: buyer 1 did not place order 0
        let mut context = PresetContext::new().with_identity(buyer(&ledger, 1));
        let err = dispatcher
            .execute("confirmOrder(0)", &mut context)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Transaction(TransactionError::Ledger(LedgerError::Rejected { .. }))
        ));
        assert!(wallet.is_empty());

        // An anonymous evaluate right after needs no signer
        let before = wallet.registrations();
        let out = dispatcher
            .execute("getOrder(0)", &mut PresetContext::new())
            .await
            .unwrap();
        assert_eq!(wallet.registrations(), before);

        let order: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(order["status"], json!("0"));
        assert_eq!(order["value"], json!("1000000000000000000"));
        assert!(order.get("0").is_none());
    }

    #[tokio::test]
    async fn test_default_account_signs_when_none_given() {
        let (ledger, dispatcher) = setup().await;
        let mut context = PresetContext::new()
            .with_value("5")
            .with_identity(buyer(&ledger, 0));
        dispatcher.execute("createOrder(2)", &mut context).await.unwrap();

        // The seller is the default account and may cancel
        let out = dispatcher
            .execute("cancelOrder(0)", &mut PresetContext::new())
            .await
            .unwrap();
        assert!(out.contains("OrderCancelled"));
    }

    #[tokio::test]
    async fn test_local_failures_before_network() {
        let (ledger, dispatcher) = setup().await;
        let sent = ledger.raw_transactions();
        let calls = ledger.requests("eth_call");
        let mut context = PresetContext::new();

        assert!(matches!(
            dispatcher.execute("nothing()", &mut context).await,
            Err(DispatchError::Abi(AbiError::UnknownMethod(_)))
        ));
        assert!(matches!(
            dispatcher.execute("getOrder(1, 2)", &mut context).await,
            Err(DispatchError::Abi(AbiError::ArgumentCountMismatch { .. }))
        ));
        assert!(matches!(
            dispatcher.execute("getOrder(x)", &mut context).await,
            Err(DispatchError::Abi(AbiError::InvalidArguments(_)))
        ));
        assert!(matches!(
            dispatcher.execute("bogus(abc)", &mut context).await,
            Err(DispatchError::Abi(AbiError::UnknownMethod(_)))
        ));
        assert!(matches!(
            dispatcher.execute("getOrder(\"not a number\")", &mut context).await,
            Err(DispatchError::Abi(AbiError::InvalidArguments(_)))
        ));

        let mut context = PresetContext::new()
            .with_value("1.5")
            .with_identity(buyer(&ledger, 0));
        assert!(matches!(
            dispatcher.execute("createOrder(1)", &mut context).await,
            Err(DispatchError::Format(UnitsError::NotAnInteger(_)))
        ));

        assert_eq!(ledger.raw_transactions(), sent);
        assert_eq!(ledger.requests("eth_call"), calls);
    }

    #[tokio::test]
    async fn test_missing_default_account() {
        let ledger = Arc::new(FakeLedger::new());
        let client = Arc::new(LedgerClient::new(ledger.clone(), FakeLedger::settings()));
        let dispatcher =
            MethodDispatcher::new(client, Arc::new(escrow_interface()), Address::repeat_byte(1));

        let err = dispatcher
            .execute("confirmOrder(0)", &mut PresetContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoDefaultAccount));
    }

    #[test]
    fn test_output_shapes() {
        let named = CallOutput::new(vec![
            ("carId".to_string(), json!("1")),
            ("buyerAddress".to_string(), json!("0xabc")),
        ]);
        assert_eq!(
            render(&shape_output(&named)),
            r#"{"carId":"1","buyerAddress":"0xabc"}"#
        );

        let unnamed = CallOutput::new(vec![
            (String::new(), json!("7")),
            (String::new(), json!(false)),
        ]);
        assert_eq!(render(&shape_output(&unnamed)), r#"{"0":"7","1":false}"#);

        assert_eq!(render(&shape_output(&CallOutput::default())), "null");
        assert_eq!(
            render(&shape_output(&CallOutput::new(vec![(String::new(), json!(true))]))),
            "true"
        );
    }
}
