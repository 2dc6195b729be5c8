//! Contract escrow CLI application
//!
//! Compile and deploy the car trading contract, call its methods and manage
//! escrow orders from the command line.

use clap::{Args, Parser, Subcommand};
use contract_escrow::cli::{self, AppConfig, AppState, SignerArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "contract-escrow")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Compile, deploy and trade through an escrow contract", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "ESCROW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct Signer {
    /// Signing account address (defaults to the configured account)
    #[arg(long)]
    address: Option<String>,

    /// Private key of the signing account
    #[arg(long, env = "ESCROW_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,
}

impl From<Signer> for SignerArgs {
    fn from(signer: Signer) -> Self {
        SignerArgs {
            address: signer.address,
            private_key: signer.private_key,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a contract source
    Compile {
        /// Source file (defaults to the configured source)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Contract name (defaults to the first contract in the source)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Compile and deploy the configured contract
    Deploy {
        /// Source file (defaults to the configured source)
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[command(flatten)]
        signer: Signer,
    },

    /// Interactive method console
    Console,

    /// Run one method command, e.g. "getOrder(0)"
    Call {
        command: String,

        /// Amount to send with a payable method, in ether or with a unit
        /// (e.g. "0.5", "100 wei")
        #[arg(long)]
        value: Option<String>,

        #[command(flatten)]
        signer: Signer,
    },

    /// Display ledger network information
    Network,

    /// Escrow order operations
    Order {
        #[command(subcommand)]
        action: OrderCommands,
    },

    /// Account operations
    Account {
        #[command(subcommand)]
        action: AccountCommands,
    },

    /// Car catalog operations
    Catalog {
        #[command(subcommand)]
        action: CatalogCommands,
    },
}

#[derive(Subcommand)]
enum OrderCommands {
    /// Number of orders
    Count,

    /// Show one order
    Show {
        index: u64,
    },

    /// List orders, newest first
    List {
        /// Only orders placed by this buyer
        #[arg(long)]
        buyer: Option<String>,
    },

    /// Place an order as a buyer
    Create {
        #[arg(long)]
        car_id: u64,

        /// Price, in ether or with a unit (defaults to the catalog price)
        #[arg(long)]
        value: Option<String>,

        #[command(flatten)]
        signer: Signer,
    },

    /// Confirm delivery as the buyer
    Confirm {
        index: u64,

        #[command(flatten)]
        signer: Signer,
    },

    /// Cancel as the seller, refunding the buyer
    Cancel {
        index: u64,

        /// Compensation paid to the buyer, in ether or with a unit
        #[arg(long, default_value = "0")]
        compensation: String,

        #[command(flatten)]
        signer: Signer,
    },

    /// Value held in escrow
    Balance,

    /// Seller address
    Seller,
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Generate a new account
    New,
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// List cars
    List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile { file, name } => {
            cli::cmd_compile(&config, file.as_deref(), name.as_deref()).await?;
        }

        Commands::Account {
            action: AccountCommands::New,
        } => cli::cmd_account_new()?,

        Commands::Catalog {
            action: CatalogCommands::List,
        } => cli::cmd_catalog_list(&config).await?,

        Commands::Deploy { file, signer } => {
            let state = AppState::new(config)?;
            cli::cmd_deploy(&state, file.as_deref(), &signer.into()).await?;
        }

        Commands::Console => {
            let state = AppState::new(config)?;
            cli::cmd_console(&state).await?;
        }

        Commands::Call {
            command,
            value,
            signer,
        } => {
            let state = AppState::new(config)?;
            cli::cmd_call(&state, &command, value.as_deref(), &signer.into()).await?;
        }

        Commands::Network => {
            let state = AppState::new(config)?;
            cli::cmd_network(&state).await?;
        }

        Commands::Order { action } => {
            let state = AppState::new(config)?;
            match action {
                OrderCommands::Count => cli::cmd_order_count(&state).await?,
                OrderCommands::Show { index } => cli::cmd_order_show(&state, index).await?,
                OrderCommands::List { buyer } => {
                    cli::cmd_order_list(&state, buyer.as_deref()).await?;
                }
                OrderCommands::Create {
                    car_id,
                    value,
                    signer,
                } => {
                    cli::cmd_order_create(&state, car_id, value.as_deref(), &signer.into())
                        .await?;
                }
                OrderCommands::Confirm { index, signer } => {
                    cli::cmd_order_confirm(&state, index, &signer.into()).await?;
                }
                OrderCommands::Cancel {
                    index,
                    compensation,
                    signer,
                } => {
                    cli::cmd_order_cancel(&state, index, &compensation, &signer.into()).await?;
                }
                OrderCommands::Balance => cli::cmd_order_balance(&state).await?,
                OrderCommands::Seller => cli::cmd_order_seller(&state).await?,
            }
        }
    }

    Ok(())
}
