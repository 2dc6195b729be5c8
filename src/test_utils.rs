//! In-memory ledger for tests
//!
//! Speaks the JSON-RPC subset the client uses, verifies signed raw
//! transactions (sender recovery, chain id, nonce, balance) and runs the
//! escrow contract's state machine natively.

use crate::contract::{Interface, MethodDescriptor};
use crate::crypto::{keccak256, SigningKey};
use crate::ledger::{ClientSettings, LedgerError, RpcLog, RpcReceipt, RpcTransport};
use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, H256, U256, U64};
use ethers::utils::rlp::Rlp;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub const ESCROW_ABI: &str = r#"[
  {"type":"constructor","inputs":[],"stateMutability":"nonpayable"},
  {"type":"function","name":"seller","constant":true,"payable":false,"inputs":[],
   "outputs":[{"name":"","type":"address"}]},
  {"type":"function","name":"getNumberOfOrders","constant":true,"payable":false,"inputs":[],
   "outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"getOrder","constant":true,"payable":false,
   "inputs":[{"name":"index","type":"uint256"}],
   "outputs":[{"name":"carId","type":"uint256"},{"name":"buyerAddress","type":"address"},
              {"name":"value","type":"uint256"},{"name":"status","type":"uint8"}]},
  {"type":"function","name":"getOrderIndicesByBuyer","constant":true,"payable":false,
   "inputs":[{"name":"buyerAddress","type":"address"}],
   "outputs":[{"name":"","type":"uint256[]"}]},
  {"type":"function","name":"getContractBalance","constant":true,"payable":false,"inputs":[],
   "outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"createOrder","constant":false,"payable":true,
   "inputs":[{"name":"carId","type":"uint256"}],"outputs":[]},
  {"type":"function","name":"confirmOrder","constant":false,"payable":false,
   "inputs":[{"name":"index","type":"uint256"}],"outputs":[]},
  {"type":"function","name":"cancelOrder","constant":false,"payable":true,
   "inputs":[{"name":"index","type":"uint256"}],"outputs":[]},
  {"type":"event","name":"OrderCreated","anonymous":false,"inputs":[
   {"name":"index","type":"uint256","indexed":true},
   {"name":"carId","type":"uint256","indexed":false},
   {"name":"buyerAddress","type":"address","indexed":false},
   {"name":"value","type":"uint256","indexed":false}]},
  {"type":"event","name":"OrderConfirmed","anonymous":false,"inputs":[
   {"name":"index","type":"uint256","indexed":true}]},
  {"type":"event","name":"OrderCancelled","anonymous":false,"inputs":[
   {"name":"index","type":"uint256","indexed":true},
   {"name":"compensation","type":"uint256","indexed":false}]}
]"#;

/// Interface of the escrow contract run by `FakeLedger`
pub fn escrow_interface() -> Interface {
    Interface::from_json(ESCROW_ABI).unwrap()
}

const STATUS_PENDING: u8 = 0;
const STATUS_SUCCEEDED: u8 = 1;
const STATUS_CANCELLED: u8 = 2;

struct FakeOrder {
    car_id: U256,
    buyer: Address,
    value: U256,
    status: u8,
}

struct EscrowContract {
    address: Address,
    seller: Address,
    orders: Vec<FakeOrder>,
}

/// Outcome of running contract code: logs on success, a reason on revert
type Execution = Result<Vec<RpcLog>, String>;

#[derive(Default)]
struct LedgerState {
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, U256>,
    receipts: HashMap<H256, RpcReceipt>,
    polls: HashMap<H256, usize>,
    contract: Option<EscrowContract>,
    requests: HashMap<String, usize>,
    raw_transactions: usize,
    block_number: u64,
    offline: bool,
    receipt_delay: usize,
    newest_first: bool,
}

/// JSON-RPC ledger simulated in memory
pub struct FakeLedger {
    interface: Interface,
    state: Mutex<LedgerState>,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLedger {
    pub const CHAIN_ID: u64 = 1337;
    pub const BYTE_CODE: &'static str = "0x6080604052";
    pub const SELLER_KEY: &'static str =
        "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    /// A ledger where the seller and three buyers hold 100 ether each
    pub fn new() -> Self {
        let ledger = Self {
            interface: escrow_interface(),
            state: Mutex::new(LedgerState::default()),
        };
        let funds = U256::exp10(20);
        ledger.fund(ledger.seller_address(), funds);
        for i in 0..3 {
            ledger.fund(ledger.buyer_address(i), funds);
        }
        ledger
    }

    /// Client settings that poll quickly and know the chain id
    pub fn settings() -> ClientSettings {
        ClientSettings {
            chain_id: Some(Self::CHAIN_ID),
            poll_interval: Duration::from_millis(5),
            receipt_timeout: Duration::from_secs(5),
        }
    }

    pub fn seller_key(&self) -> SigningKey {
        SigningKey::from_hex(Self::SELLER_KEY).unwrap()
    }

    pub fn seller_address(&self) -> Address {
        self.seller_key().address()
    }

    pub fn buyer_key(&self, i: u8) -> SigningKey {
        SigningKey::from_hex(&format!("0x{}", hex::encode([i + 0x21; 32]))).unwrap()
    }

    pub fn buyer_address(&self, i: u8) -> Address {
        self.buyer_key(i).address()
    }

    pub fn fund(&self, address: Address, amount: U256) {
        let mut state = self.state.lock().unwrap();
        *state.balances.entry(address).or_default() += amount;
    }

    pub fn balance_of(&self, address: Address) -> U256 {
        let state = self.state.lock().unwrap();
        state.balances.get(&address).copied().unwrap_or_default()
    }

    /// Number of raw transactions received
    pub fn raw_transactions(&self) -> usize {
        self.state.lock().unwrap().raw_transactions
    }

    /// Number of requests received for an RPC method
    pub fn requests(&self, method: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.requests.get(method).copied().unwrap_or(0)
    }

    /// Fail every request with a connectivity error
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// List a buyer's order indices newest first
    pub fn set_newest_first(&self, newest_first: bool) {
        self.state.lock().unwrap().newest_first = newest_first;
    }

    /// Answer this many receipt polls with `null` before the receipt
    pub fn set_receipt_delay(&self, polls: usize) {
        self.state.lock().unwrap().receipt_delay = polls;
    }

    fn method_for(&self, data: &[u8]) -> Option<&MethodDescriptor> {
        let selector = data.get(..4)?;
        self.interface
            .methods()
            .find(|m| m.selector().map(|s| s.as_slice() == selector).unwrap_or(false))
    }

    fn handle(&self, method: &str, params: &Value) -> Result<Value, LedgerError> {
        let mut state = self.state.lock().unwrap();
        *state.requests.entry(method.to_string()).or_default() += 1;

        if state.offline {
            return Err(LedgerError::Connectivity {
                endpoint: "fake".to_string(),
                message: "connection refused".to_string(),
            });
        }

        match method {
            "net_version" => Ok(json!("5777")),
            "eth_chainId" => Ok(json!(U64::from(Self::CHAIN_ID))),
            "eth_blockNumber" => Ok(json!(U64::from(state.block_number))),
            "eth_gasPrice" => Ok(json!(U256::one())),
            "eth_estimateGas" => Ok(json!(U256::from(200_000u64))),
            "eth_getBalance" => {
                let address = param_address(params, 0)?;
                Ok(json!(state.balances.get(&address).copied().unwrap_or_default()))
            }
            "eth_getTransactionCount" => {
                let address = param_address(params, 0)?;
                Ok(json!(state.nonces.get(&address).copied().unwrap_or_default()))
            }
            "eth_call" => {
                let call = &params[0];
                let from = call
                    .get("from")
                    .and_then(|v| serde_json::from_value::<Address>(v.clone()).ok())
                    .unwrap_or_default();
                let to = call
                    .get("to")
                    .and_then(|v| serde_json::from_value::<Address>(v.clone()).ok());
                let data: Bytes = call
                    .get("data")
                    .or_else(|| call.get("input"))
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default();

                let output = match to {
                    Some(to) if state.contract.as_ref().map(|c| c.address) == Some(to) => {
                        self.view(&state, from, &data)
                    }
                    _ => Ok(Vec::new()),
                };
                output
                    .map(|bytes| json!(Bytes::from(bytes)))
                    .map_err(|reason| LedgerError::Rejected {
                        code: Some(-32000),
                        message: format!("execution reverted: {}", reason),
                    })
            }
            "eth_sendRawTransaction" => {
                let raw: Bytes = serde_json::from_value(params[0].clone())
                    .map_err(|e| LedgerError::invalid_response(method, e))?;
                state.raw_transactions += 1;
                self.apply_raw(&mut state, &raw).map(|hash| json!(hash))
            }
            "eth_getTransactionReceipt" => {
                let hash: H256 = serde_json::from_value(params[0].clone())
                    .map_err(|e| LedgerError::invalid_response(method, e))?;
                let delay = state.receipt_delay;
                let polls = state.polls.entry(hash).or_default();
                *polls += 1;
                if *polls <= delay {
                    return Ok(Value::Null);
                }
                Ok(state
                    .receipts
                    .get(&hash)
                    .map(|r| serde_json::to_value(r).unwrap())
                    .unwrap_or(Value::Null))
            }
            other => Err(LedgerError::Rejected {
                code: Some(-32601),
                message: format!("method {} not found", other),
            }),
        }
    }

    fn apply_raw(&self, state: &mut LedgerState, raw: &Bytes) -> Result<H256, LedgerError> {
        let rejected = |message: &str| LedgerError::Rejected {
            code: Some(-32000),
            message: message.to_string(),
        };

        let rlp = Rlp::new(raw.as_ref());
        let (tx, signature) =
            TypedTransaction::decode_signed(&rlp).map_err(|_| rejected("invalid raw transaction"))?;
        let sender = signature
            .recover(tx.sighash())
            .map_err(|_| rejected("invalid signature"))?;

        if tx.chain_id().map(|id| id.as_u64()) != Some(Self::CHAIN_ID) {
            return Err(rejected("invalid chain id"));
        }

        let expected_nonce = state.nonces.get(&sender).copied().unwrap_or_default();
        if tx.nonce().copied() != Some(expected_nonce) {
            return Err(rejected("nonce too low"));
        }

        let value = tx.value().copied().unwrap_or_default();
        if state.balances.get(&sender).copied().unwrap_or_default() < value {
            return Err(rejected("insufficient funds for gas * price + value"));
        }

        state.nonces.insert(sender, expected_nonce + 1);
        state.block_number += 1;

        let hash = H256::from(keccak256(raw.as_ref()));
        let data = tx.data().cloned().unwrap_or_default();
        let to = tx.to().and_then(|t| t.as_address().copied());

        let mut receipt = RpcReceipt {
            transaction_hash: hash,
            contract_address: None,
            status: Some(U64::one()),
            logs: Vec::new(),
        };

        match to {
            None => {
                let address = ethers::utils::get_contract_address(sender, expected_nonce);
                state.contract = Some(EscrowContract {
                    address,
                    seller: sender,
                    orders: Vec::new(),
                });
                receipt.contract_address = Some(address);
            }
            Some(to) if state.contract.as_ref().map(|c| c.address) == Some(to) => {
                transfer(state, sender, to, value);
                match self.execute(state, sender, value, &data) {
                    Ok(logs) => receipt.logs = logs,
                    Err(reason) => {
                        log::debug!("Fake ledger reverted: {}", reason);
                        transfer(state, to, sender, value);
                        receipt.status = Some(U64::zero());
                    }
                }
            }
            Some(to) => transfer(state, sender, to, value),
        }

        state.receipts.insert(hash, receipt);
        Ok(hash)
    }

    fn view(&self, state: &LedgerState, _from: Address, data: &[u8]) -> Result<Vec<u8>, String> {
        let contract = state.contract.as_ref().ok_or("no contract")?;
        let method = self.method_for(data).ok_or("unknown selector")?;
        let args = decode_args(method, data)?;

        let tokens = match method.name.as_str() {
            "seller" => vec![Token::Address(contract.seller)],
            "getNumberOfOrders" => vec![Token::Uint(contract.orders.len().into())],
            "getContractBalance" => vec![Token::Uint(
                state
                    .balances
                    .get(&contract.address)
                    .copied()
                    .unwrap_or_default(),
            )],
            "getOrder" => {
                let order = order_at(contract, &args)?;
                vec![
                    Token::Uint(order.car_id),
                    Token::Address(order.buyer),
                    Token::Uint(order.value),
                    Token::Uint(order.status.into()),
                ]
            }
            "getOrderIndicesByBuyer" => {
                let buyer = args
                    .first()
                    .and_then(|t| t.clone().into_address())
                    .ok_or("bad buyer")?;
                let mut indices: Vec<Token> = contract
                    .orders
                    .iter()
                    .enumerate()
                    .filter(|(_, o)| o.buyer == buyer)
                    .map(|(i, _)| Token::Uint(i.into()))
                    .collect();
                if state.newest_first {
                    indices.reverse();
                }
                vec![Token::Array(indices)]
            }
            _ => return Err("not a view".to_string()),
        };
        Ok(abi::encode(&tokens))
    }

    fn execute(
        &self,
        state: &mut LedgerState,
        sender: Address,
        value: U256,
        data: &[u8],
    ) -> Execution {
        let method = self.method_for(data).ok_or("unknown selector")?.clone();
        let args = decode_args(&method, data)?;
        let contract = state.contract.as_mut().ok_or("no contract")?;
        let address = contract.address;
        let event_topic = |name: &str| -> Result<H256, String> {
            self.interface
                .events()
                .find(|e| e.name == name)
                .and_then(|e| e.topic().ok())
                .ok_or_else(|| format!("no event {}", name))
        };

        match method.name.as_str() {
            "createOrder" => {
                if value.is_zero() {
                    return Err("order value must be positive".to_string());
                }
                if sender == contract.seller {
                    return Err("seller cannot buy".to_string());
                }
                let car_id = args
                    .first()
                    .and_then(|t| t.clone().into_uint())
                    .ok_or("bad car id")?;
                let index = contract.orders.len();
                contract.orders.push(FakeOrder {
                    car_id,
                    buyer: sender,
                    value,
                    status: STATUS_PENDING,
                });
                Ok(vec![RpcLog {
                    address,
                    topics: vec![event_topic("OrderCreated")?, index_topic(index)],
                    data: Bytes::from(abi::encode(&[
                        Token::Uint(car_id),
                        Token::Address(sender),
                        Token::Uint(value),
                    ])),
                }])
            }
            "confirmOrder" => {
                if !value.is_zero() {
                    return Err("not payable".to_string());
                }
                let index = pending_index(contract, &args)?;
                if contract.orders[index].buyer != sender {
                    return Err("only the buyer can confirm".to_string());
                }
                contract.orders[index].status = STATUS_SUCCEEDED;
                let (seller, amount) = (contract.seller, contract.orders[index].value);
                transfer(state, address, seller, amount);
                Ok(vec![RpcLog {
                    address,
                    topics: vec![event_topic("OrderConfirmed")?, index_topic(index)],
                    data: Bytes::default(),
                }])
            }
            "cancelOrder" => {
                if sender != contract.seller {
                    return Err("only the seller can cancel".to_string());
                }
                let index = pending_index(contract, &args)?;
                contract.orders[index].status = STATUS_CANCELLED;
                let (buyer, amount) = (contract.orders[index].buyer, contract.orders[index].value);
                // Refund plus the compensation sent with this call
                transfer(state, address, buyer, amount + value);
                Ok(vec![RpcLog {
                    address,
                    topics: vec![event_topic("OrderCancelled")?, index_topic(index)],
                    data: Bytes::from(abi::encode(&[Token::Uint(value)])),
                }])
            }
            other => Err(format!("{} is not a state-changing method", other)),
        }
    }
}

#[async_trait]
impl RpcTransport for FakeLedger {
    async fn request(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        self.handle(method, &params)
    }
}

fn transfer(state: &mut LedgerState, from: Address, to: Address, amount: U256) {
    if amount.is_zero() {
        return;
    }
    *state.balances.entry(from).or_default() -= amount;
    *state.balances.entry(to).or_default() += amount;
}

fn decode_args(method: &MethodDescriptor, data: &[u8]) -> Result<Vec<Token>, String> {
    let types = method
        .inputs
        .iter()
        .map(|p| p.abi_type().map(|t| t.to_param_type()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    abi::decode(&types, &data[4..]).map_err(|e| e.to_string())
}

fn order_at<'a>(contract: &'a EscrowContract, args: &[Token]) -> Result<&'a FakeOrder, String> {
    let index = args
        .first()
        .and_then(|t| t.clone().into_uint())
        .ok_or("bad index")?;
    if index >= contract.orders.len().into() {
        return Err("order index out of range".to_string());
    }
    Ok(&contract.orders[index.as_usize()])
}

fn pending_index(contract: &EscrowContract, args: &[Token]) -> Result<usize, String> {
    let order = order_at(contract, args)?;
    if order.status != STATUS_PENDING {
        return Err("order is not pending".to_string());
    }
    Ok(args
        .first()
        .and_then(|t| t.clone().into_uint())
        .map(|i| i.as_usize())
        .unwrap_or_default())
}

fn index_topic(index: usize) -> H256 {
    let mut bytes = [0u8; 32];
    U256::from(index).to_big_endian(&mut bytes);
    H256::from(bytes)
}

fn param_address(params: &Value, position: usize) -> Result<Address, LedgerError> {
    serde_json::from_value(params[position].clone())
        .map_err(|e| LedgerError::invalid_response("address parameter", e))
}
