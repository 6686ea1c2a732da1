//! dapp-client: Ethereum and Solana demo flows.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI (clap) ──▶ commands::{ethereum, solana}
//!                        │
//!                        ▼
//!        transaction builder ──▶ wallet / keypair (sign)
//!                        │
//!                        ▼
//!               SubmissionWatcher ──▶ adapter traits
//!                 │          │             │
//!       submit_with_retry  watch_confirmation
//!                 │          │             │
//!                 ▼          ▼             ▼
//!        EthereumClient (alloy)    SolanaNode (JSON-RPC + WebSocket)
//!
//!   Cross-cutting: config (TOML), observability (tracing, metrics),
//!                  resilience (backoff, retry policy, RPC timeouts)
//! ```

use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::{Path, PathBuf};

use dapp_client::blockchain::ethereum::CounterAction;
use dapp_client::commands::solana::Recipient;
use dapp_client::commands::{ethereum, solana};
use dapp_client::config::{load_config, AppConfig};
use dapp_client::observability::logging;

const DEFAULT_CONFIG_PATH: &str = "etc/config.toml";

#[derive(Parser)]
#[command(name = "dapp-client")]
#[command(about = "Ethereum and Solana transaction demos", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the latest Ethereum block
    Block,
    /// Print an Ethereum balance (defaults to the configured wallet)
    EthBalance {
        #[arg(long)]
        address: Option<String>,
    },
    /// Send ETH from the configured wallet
    EthTransfer {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount_wei: String,
        /// Return after submission without waiting for confirmation
        #[arg(long)]
        no_wait: bool,
    },
    /// Deploy and use the Counter contract
    Counter {
        #[command(subcommand)]
        action: CounterCommand,
    },
    /// Print a Solana balance (defaults to the configured keypair)
    SolBalance {
        #[arg(long)]
        address: Option<String>,
    },
    /// Request test SOL for the configured keypair
    SolAirdrop {
        #[arg(long, default_value_t = 1_000_000_000)]
        lamports: u64,
        #[arg(long)]
        no_wait: bool,
    },
    /// Send SOL from the configured keypair
    SolTransfer {
        /// Receiver address (base58)
        #[arg(long, conflicts_with = "to_keypair", required_unless_present = "to_keypair")]
        to: Option<String>,
        /// Receiver keypair file; its public key is used
        #[arg(long)]
        to_keypair: Option<PathBuf>,
        #[arg(long)]
        lamports: String,
        #[arg(long)]
        no_wait: bool,
    },
}

#[derive(Subcommand)]
enum CounterCommand {
    /// Deploy a new Counter
    Deploy {
        #[arg(long)]
        no_wait: bool,
    },
    /// Read the current count
    Get {
        #[arg(long)]
        contract: String,
    },
    Increment {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        no_wait: bool,
    },
    Decrement {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        no_wait: bool,
    },
    Reset {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        no_wait: bool,
    },
}

fn read_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Ok(load_config(Path::new(DEFAULT_CONFIG_PATH))?),
        None => Ok(AppConfig::default()),
    }
}

async fn run(config: &AppConfig, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Block => ethereum::block_info(config).await?,
        Commands::EthBalance { address } => ethereum::balance(config, address.as_deref()).await?,
        Commands::EthTransfer {
            to,
            amount_wei,
            no_wait,
        } => ethereum::transfer(config, &to, &amount_wei, !no_wait).await?,
        Commands::Counter { action } => match action {
            CounterCommand::Deploy { no_wait } => ethereum::counter_deploy(config, !no_wait).await?,
            CounterCommand::Get { contract } => ethereum::counter_get(config, &contract).await?,
            CounterCommand::Increment { contract, no_wait } => {
                ethereum::counter_invoke(config, &contract, CounterAction::Increment, !no_wait).await?
            }
            CounterCommand::Decrement { contract, no_wait } => {
                ethereum::counter_invoke(config, &contract, CounterAction::Decrement, !no_wait).await?
            }
            CounterCommand::Reset { contract, no_wait } => {
                ethereum::counter_invoke(config, &contract, CounterAction::Reset, !no_wait).await?
            }
        },
        Commands::SolBalance { address } => solana::balance(config, address.as_deref()).await?,
        Commands::SolAirdrop { lamports, no_wait } => solana::airdrop(config, lamports, !no_wait).await?,
        Commands::SolTransfer {
            to,
            to_keypair,
            lamports,
            no_wait,
        } => {
            let recipient = match (&to, &to_keypair) {
                (Some(address), _) => Recipient::Address(address),
                (None, Some(path)) => Recipient::KeypairFile(path),
                (None, None) => return Err("either --to or --to-keypair is required".into()),
            };
            solana::transfer(config, recipient, &lamports, !no_wait).await?
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = read_config(cli.config.as_deref())?;

    logging::init(&config.observability)?;
    tracing::info!(
        chain_id = config.ethereum.chain_id,
        solana_network = %config.solana.network,
        max_attempts = config.submission.max_attempts,
        "Configuration loaded"
    );

    run_until_interrupted(run(&config, cli.command), tokio::signal::ctrl_c()).await
}

/// Drive `work` until it finishes or `interrupt` fires. An interrupted flow
/// may already have submitted a transaction, so it exits with an error.
async fn run_until_interrupted<W, I, T>(work: W, interrupt: I) -> Result<(), Box<dyn std::error::Error>>
where
    W: Future<Output = Result<(), Box<dyn std::error::Error>>>,
    I: Future<Output = T>,
{
    tokio::select! {
        result = work => result,
        _ = interrupt => {
            tracing::warn!("Interrupted, cancelling");
            Err("Interrupted before the command finished; check chain state for any submitted transaction".into())
        }
    }
}
