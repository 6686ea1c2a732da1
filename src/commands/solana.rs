//! Solana flows: balance, airdrop and SOL transfer.

use std::path::Path;
use std::sync::Arc;

use crate::blockchain::solana::client::CHAIN_LABEL;
use crate::blockchain::solana::{build_transfer, format_sol, parse_pubkey, Keypair, SolanaNode};
use crate::blockchain::{BlockchainError, BlockchainResult, SubmissionWatcher, TxId};
use crate::commands::explorer_link;
use crate::config::{AppConfig, SolanaConfig, SolanaNetwork};
use crate::resilience::RetryPolicy;

const EXPLORER_BASE: &str = "https://explorer.solana.com";

fn transaction_link(config: &SolanaConfig, id: &TxId) -> String {
    let path = match config.network {
        SolanaNetwork::Mainnet => format!("tx/{id}"),
        network => format!("tx/{id}?cluster={network}"),
    };
    explorer_link(EXPLORER_BASE, &path)
}

fn watcher(config: &AppConfig) -> BlockchainResult<SubmissionWatcher<SolanaNode>> {
    let node = SolanaNode::new(&config.solana)?;
    Ok(SubmissionWatcher::new(
        Arc::new(node),
        RetryPolicy::from_config(&config.submission),
        CHAIN_LABEL,
    ))
}

fn payer(config: &AppConfig) -> BlockchainResult<Keypair> {
    Keypair::read_from_file(Path::new(&config.solana.keypair_path))
}

/// Print the balance of `address`, or of the configured keypair.
pub async fn balance(config: &AppConfig, address: Option<&str>) -> BlockchainResult<()> {
    let account = match address {
        Some(input) => parse_pubkey(input)?,
        None => payer(config)?.pubkey(),
    };
    let watcher = watcher(config)?;
    let lamports = watcher.adapter().rpc().get_balance(&account).await?;

    println!("Balance of {account}: {} SOL ({lamports} lamports)", format_sol(lamports));
    Ok(())
}

/// Request test funds for the configured keypair and wait for them to land.
pub async fn airdrop(config: &AppConfig, lamports: u64, wait: bool) -> BlockchainResult<()> {
    if config.solana.rpc_url.is_none() && !config.solana.network.supports_airdrop() {
        return Err(BlockchainError::Unsupported {
            operation: "Airdrop",
            network: config.solana.network.to_string(),
        });
    }

    let account = payer(config)?.pubkey();
    let watcher = watcher(config)?;
    let rpc = watcher.adapter().rpc();

    let id = rpc.request_airdrop(&account, lamports).await?;
    println!("Airdrop requested: {id}");
    println!("Explorer: {}", transaction_link(&config.solana, &id));

    if wait && confirm(config, &watcher, &id).await? {
        let balance = rpc.get_balance(&account).await?;
        println!("New balance: {} SOL", format_sol(balance));
    }
    Ok(())
}

/// Where a transfer goes: an address, or the public key of a keypair file.
#[derive(Debug, Clone, Copy)]
pub enum Recipient<'a> {
    Address(&'a str),
    KeypairFile(&'a Path),
}

/// Send `lamports` from the configured keypair to `recipient`.
pub async fn transfer(
    config: &AppConfig,
    recipient: Recipient<'_>,
    lamports: &str,
    wait: bool,
) -> BlockchainResult<()> {
    let keypair = payer(config)?;
    let receiver = match recipient {
        Recipient::Address(address) => address.to_string(),
        Recipient::KeypairFile(path) => Keypair::read_from_file(path)?.pubkey().to_string(),
    };
    let watcher = watcher(config)?;
    let rpc = watcher.adapter().rpc();

    let blockhash = rpc.get_latest_blockhash().await?;
    println!("Recent blockhash: {}", blockhash.hash);
    println!("Last valid block height: {}", blockhash.last_valid_block_height);

    let transfer = build_transfer(&keypair.pubkey().to_string(), &receiver, lamports, blockhash)?;
    match rpc.get_fee_for_message(&transfer.message()).await {
        Ok(Some(fee)) => println!("Estimated fee: {fee} lamports"),
        Ok(None) => tracing::warn!("Blockhash expired before fee estimation"),
        Err(e) => tracing::warn!(error = %e, "Fee estimation failed"),
    }
    let tx = keypair.sign_transfer(&transfer)?;

    println!(
        "Sending {} SOL from {} to {}",
        format_sol(transfer.lamports()),
        transfer.from(),
        transfer.to()
    );
    let id = watcher.submit_with_retry(&tx).await?;
    println!("Transaction sent: {id}");
    println!("Explorer: {}", transaction_link(&config.solana, &id));

    if wait {
        confirm(config, &watcher, &id).await?;
    }
    Ok(())
}

/// Watch `id`; on timeout, fall back to a signature status query.
async fn confirm(
    config: &AppConfig,
    watcher: &SubmissionWatcher<SolanaNode>,
    id: &TxId,
) -> BlockchainResult<bool> {
    match watcher
        .watch_confirmation(id, config.submission.confirmation_timeout())
        .await
    {
        Ok(event) => {
            match event.slot {
                Some(slot) => println!("Transaction confirmed in slot {slot}"),
                None => println!("Transaction confirmed"),
            }
            Ok(true)
        }
        Err(BlockchainError::ConfirmationTimeout { id, waited }) => {
            println!("No confirmation within {}s, checking signature status", waited.as_secs());
            match watcher.adapter().rpc().get_signature_status(&id).await? {
                Some(status) if status.err.is_none() => {
                    println!(
                        "Transaction landed in slot {} ({})",
                        status.slot,
                        status.confirmation_status.as_deref().unwrap_or("unknown")
                    );
                    Ok(true)
                }
                Some(status) => Err(BlockchainError::TransactionFailed {
                    reason: status.err.map(|err| err.to_string()).unwrap_or_default(),
                    id,
                }),
                None => {
                    println!("Transaction {id} is not yet visible; its outcome is unknown");
                    Err(BlockchainError::ConfirmationTimeout { id, waited })
                }
            }
        }
        Err(e) => Err(e),
    }
}
