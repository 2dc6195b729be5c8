//! CLI commands for the escrow client
//!
//! Implements all command handlers for the CLI interface.

use super::config::AppConfig;
use crate::contract::{CompilationResult, CompilationService, Interface, SolcCompiler};
use crate::core::{format_ether, parse_amount, Transaction};
use crate::crypto::{format_address, parse_address, Identity, SigningKey};
use crate::dispatch::{MethodDispatcher, PresetContext, Session};
use crate::escrow::{EscrowOrderManager, Order};
use crate::ledger::LedgerClient;
use crate::storage::{CarCatalog, DeploymentRecord};
use ethers::types::{Address, U256};
use std::path::Path;
use std::sync::Arc;
use tokio::io::BufReader;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Signer given on the command line
#[derive(Debug, Default, Clone)]
pub struct SignerArgs {
    pub address: Option<String>,
    pub private_key: Option<String>,
}

/// Application state
pub struct AppState {
    pub config: AppConfig,
    pub client: Arc<LedgerClient>,
}

impl AppState {
    /// Initialize application state
    pub fn new(config: AppConfig) -> CliResult<Self> {
        let client = LedgerClient::http(
            &config.network.rpc_endpoint,
            config.request_timeout(),
            config.client_settings(),
        )?;

        Ok(Self {
            config,
            client: Arc::new(client),
        })
    }

    /// The signer from the command line, else the configured default account
    pub fn signer(&self, args: &SignerArgs) -> CliResult<Identity> {
        match (&args.address, &args.private_key) {
            (Some(address), Some(key)) => Ok(Identity::new(address, key)?),
            (None, None) => match self.config.default_account() {
                Some(account) => Ok(account.identity()?),
                None => Err("No signer given and no default account configured".into()),
            },
            _ => Err("Both --address and --private-key are required".into()),
        }
    }

    /// Deployment record of the configured contract
    pub async fn deployment(&self) -> CliResult<(Arc<Interface>, Address)> {
        let path = self.config.record_path();
        let record = DeploymentRecord::load(&path).await.map_err(|e| {
            format!(
                "No usable deployment record at {} ({}). Run `deploy` first.",
                path.display(),
                e
            )
        })?;
        let address = record.contract_address()?;
        Ok((Arc::new(record.interface_description), address))
    }

    pub async fn order_manager(&self) -> CliResult<EscrowOrderManager> {
        let (interface, address) = self.deployment().await?;
        Ok(EscrowOrderManager::new(self.client.clone(), interface, address)
            .with_gas(self.config.gas(), self.config.gas_price()))
    }

    pub async fn dispatcher(&self) -> CliResult<MethodDispatcher> {
        let (interface, address) = self.deployment().await?;
        let mut dispatcher = MethodDispatcher::new(self.client.clone(), interface, address)
            .with_gas(self.config.gas(), self.config.gas_price());
        if let Some(account) = self.config.default_account() {
            dispatcher = dispatcher.with_default_account(account);
        }
        Ok(dispatcher)
    }
}

fn compilation_service(config: &AppConfig) -> CompilationService {
    CompilationService::new(Arc::new(SolcCompiler::new(config.paths.solc.clone())))
        .with_output_dir(config.paths.compile_dir.clone())
}

fn print_diagnostics(result: &CompilationResult) {
    for warning in &result.warnings {
        println!("   ⚠️  {}", warning);
    }
    for error in &result.errors {
        println!("   ❌ {}", error);
    }
}

/// Compile a contract source
pub async fn cmd_compile(
    config: &AppConfig,
    source: Option<&Path>,
    name: Option<&str>,
) -> CliResult<()> {
    let source = source.unwrap_or(config.contract.source.as_path());
    println!("🔨 Compiling {:?}...", source);

    let result = compilation_service(config)
        .compile_file(source, name)
        .await?;
    print_diagnostics(&result);

    if !result.successful {
        return Err(result.message.into());
    }

    println!("✅ {}", result.message);
    println!("   📜 Contract: {}", result.name.as_deref().unwrap_or_default());
    println!("   🧱 Code size: {} bytes", result.byte_code.len() / 2);
    println!("   🔌 Interface entries: {}", result.interface_description.len());
    println!("   📁 Artifact directory: {:?}", config.paths.compile_dir);
    Ok(())
}

/// Compile and deploy the configured contract, then record its address
pub async fn cmd_deploy(
    state: &AppState,
    source: Option<&Path>,
    signer: &SignerArgs,
) -> CliResult<()> {
    let config = &state.config;
    let source = source.unwrap_or(config.contract.source.as_path());
    let name = config.contract.name.as_str();
    let identity = state.signer(signer)?;

    println!("📜 Deploying {} from {:?}...", name, source);

    let result = compilation_service(config)
        .compile_file(source, Some(name))
        .await?;
    print_diagnostics(&result);
    if !result.successful {
        return Err(result.message.into());
    }

    let interface = Arc::new(result.interface_description);
    let receipt = Transaction::deployment(
        interface.clone(),
        &result.byte_code,
        &config.contract.constructor_args,
    )?
    .gas(config.gas())
    .gas_price(config.gas_price())
    .signer(identity)
    .submit(&state.client)
    .await?;

    let address = receipt
        .contract_address
        .ok_or("Receipt carries no contract address")?;
    let record_path = config.record_path();
    DeploymentRecord::new(address, (*interface).clone())
        .save(&record_path)
        .await?;

    println!("✅ Contract deployed!");
    println!("   📍 Address: {}", format_address(&address));
    println!("   🧾 Transaction: {:?}", receipt.transaction_hash);
    println!("   📁 Record: {:?}", record_path);
    Ok(())
}

/// Print network information
pub async fn cmd_network(state: &AppState) -> CliResult<()> {
    let info = state.client.network_info().await?;

    println!("🌐 Connected to {}", state.config.network.rpc_endpoint);
    println!("   ├─ Network ID: {}", info.network_id);
    println!("   ├─ Chain ID: {}", info.chain_id);
    println!("   └─ Current block: {}", info.block_number);
    Ok(())
}

/// Interactive method console over stdin and stdout
pub async fn cmd_console(state: &AppState) -> CliResult<()> {
    cmd_network(state).await?;
    let dispatcher = state.dispatcher().await?;
    println!(
        "📜 Contract {} loaded from {:?}",
        format_address(&dispatcher.contract_address()),
        state.config.record_path()
    );
    println!();

    let mut session = Session::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    session.run(&dispatcher).await?;
    Ok(())
}

/// Run one method command without prompting. `value` is an amount such as
/// `0.5` or `100 wei`.
pub async fn cmd_call(
    state: &AppState,
    command: &str,
    value: Option<&str>,
    signer: &SignerArgs,
) -> CliResult<()> {
    let dispatcher = state.dispatcher().await?;

    let mut context = PresetContext::new();
    if let Some(value) = value {
        context = context.with_value(parse_amount(value)?.to_string());
    }
    if signer.address.is_some() || signer.private_key.is_some() {
        context = context.with_identity(state.signer(signer)?);
    }

    let output = dispatcher.execute(command, &mut context).await?;
    println!("{}", output);
    Ok(())
}

fn print_order(order: &Order) {
    println!("📦 Order #{}", order.index);
    println!("   ├─ Car ID: {}", order.car_id);
    println!("   ├─ Value: {} ETH ({} wei)", format_ether(order.value), order.value);
    println!("   ├─ Buyer: {}", format_address(&order.buyer_address));
    println!("   └─ Status: {}", order.status);
}

pub async fn cmd_order_count(state: &AppState) -> CliResult<()> {
    let count = state.order_manager().await?.order_count().await?;
    println!("📦 Orders: {}", count);
    Ok(())
}

pub async fn cmd_order_show(state: &AppState, index: u64) -> CliResult<()> {
    let order = state.order_manager().await?.order(index).await?;
    print_order(&order);
    Ok(())
}

/// List orders, newest first
pub async fn cmd_order_list(state: &AppState, buyer: Option<&str>) -> CliResult<()> {
    let manager = state.order_manager().await?;
    let mut orders = match buyer {
        Some(buyer) => manager.orders_by_buyer(parse_address(buyer)?).await?,
        None => manager.all_orders().await?,
    };

    if orders.is_empty() {
        println!("📦 No orders yet.");
        return Ok(());
    }

    orders.reverse();
    println!("📦 Orders ({}):", orders.len());
    for order in &orders {
        println!(
            "   #{:<4} car {:<4} {:>12} ETH  {}  {}",
            order.index,
            order.car_id,
            format_ether(order.value),
            format_address(&order.buyer_address),
            order.status
        );
    }
    Ok(())
}

/// Place an order; the price comes from the catalog unless a value is given
pub async fn cmd_order_create(
    state: &AppState,
    car_id: u64,
    value: Option<&str>,
    signer: &SignerArgs,
) -> CliResult<()> {
    let catalog = CarCatalog::load(&state.config.paths.catalog).await?;
    let car = catalog.available(car_id)?;
    let value = match value {
        Some(amount) => parse_amount(amount)?,
        None => car.price_wei()?,
    };

    let buyer = state.signer(signer)?;
    let manager = state.order_manager().await?;
    if manager.seller_address().await? == buyer.address() {
        return Err("Seller cannot perform this action.".into());
    }

    println!("🛒 Ordering {} for {} ETH...", car.name, format_ether(value));
    let order = manager.create_order(car_id, value, buyer).await?;
    println!("✅ Order created!");
    print_order(&order);
    Ok(())
}

/// Buyer confirms delivery of a pending order
pub async fn cmd_order_confirm(state: &AppState, index: u64, signer: &SignerArgs) -> CliResult<()> {
    let buyer = state.signer(signer)?;
    let manager = state.order_manager().await?;

    let order = manager.pending_order(index).await?;
    if order.buyer_address != buyer.address() {
        return Err("Only the buyer of this order can confirm it.".into());
    }

    let update = manager.confirm_order(index, buyer).await?;
    println!("✅ Order #{} is now {}", update.index, update.status);
    Ok(())
}

/// Seller cancels a pending order, refunding the buyer plus compensation
pub async fn cmd_order_cancel(
    state: &AppState,
    index: u64,
    compensation: &str,
    signer: &SignerArgs,
) -> CliResult<()> {
    let compensation = parse_amount(compensation)?;
    let seller = state.signer(signer)?;
    let manager = state.order_manager().await?;

    if manager.seller_address().await? != seller.address() {
        return Err("Only seller can perform this action.".into());
    }
    manager.pending_order(index).await?;

    let update = manager.cancel_order(index, compensation, seller).await?;
    println!("✅ Order #{} is now {}", update.index, update.status);
    println!(
        "   💸 Compensation: {} ETH ({} wei)",
        format_ether(compensation),
        compensation
    );
    Ok(())
}

pub async fn cmd_order_balance(state: &AppState) -> CliResult<()> {
    let balance: U256 = state.order_manager().await?.escrow_balance().await?;
    println!("💰 Escrow balance: {} ETH ({} wei)", format_ether(balance), balance);
    Ok(())
}

pub async fn cmd_order_seller(state: &AppState) -> CliResult<()> {
    let seller = state.order_manager().await?.seller_address().await?;
    println!("🏷️  Seller: {}", format_address(&seller));
    Ok(())
}

/// Generate a fresh account
pub fn cmd_account_new() -> CliResult<()> {
    let key = SigningKey::generate();

    println!("🔐 New account created!");
    println!("   📍 Address: {}", format_address(&key.address()));
    println!("   🔑 Private key: {}", key.private_key_hex());
    println!("   ⚠️  Store the private key safely; it is not saved anywhere.");
    Ok(())
}

pub async fn cmd_catalog_list(config: &AppConfig) -> CliResult<()> {
    let catalog = CarCatalog::load(&config.paths.catalog).await?;

    if catalog.cars().is_empty() {
        println!("🚗 The catalog is empty.");
        return Ok(());
    }

    println!("🚗 Cars ({}):", catalog.cars().len());
    for car in catalog.cars() {
        let stock = if car.quantity == 0 {
            "sold out".to_string()
        } else {
            format!("{} left", car.quantity)
        };
        println!(
            "   #{:<4} {:<24} {:>8} ETH  {}",
            car.car_id, car.name, car.price, stock
        );
    }
    Ok(())
}
