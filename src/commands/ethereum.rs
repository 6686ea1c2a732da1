//! Ethereum flows: block info, balance, transfer and the Counter contract.

use alloy::primitives::utils::format_ether;
use alloy::primitives::TxHash;
use std::sync::Arc;

use crate::blockchain::ethereum::client::CHAIN_LABEL;
use crate::blockchain::ethereum::counter::{self, CounterAction};
use crate::blockchain::ethereum::transaction::parse_address;
use crate::blockchain::ethereum::{EthereumClient, TxBuilder, Wallet};
use crate::blockchain::{BlockchainError, BlockchainResult, RpcError, SignedTransaction, SubmissionWatcher, TxId};
use crate::commands::explorer_link;
use crate::config::AppConfig;
use crate::resilience::RetryPolicy;

/// Print the header fields of the latest block.
pub async fn block_info(config: &AppConfig) -> BlockchainResult<()> {
    let client = EthereumClient::connect(config.ethereum.clone()).await?;
    let block = client.get_latest_block().await?;

    println!("Block number:      {}", block.number);
    println!("Block hash:        {}", block.hash);
    println!("Parent hash:       {}", block.parent_hash);
    println!("Timestamp:         {}", block.timestamp);
    println!("Transactions:      {}", block.transaction_count);
    println!("Difficulty:        {}", block.difficulty);
    println!("Gas limit:         {}", block.gas_limit);
    println!("Gas used:          {}", block.gas_used);
    println!("Miner:             {}", block.miner);
    Ok(())
}

/// Print the balance of `address`, or of the configured wallet.
pub async fn balance(config: &AppConfig, address: Option<&str>) -> BlockchainResult<()> {
    let address = match address {
        Some(input) => parse_address(input)?,
        None => Wallet::from_config(&config.ethereum)?.address(),
    };
    let client = EthereumClient::connect(config.ethereum.clone()).await?;
    let wei = client.get_balance(address).await?;

    println!("Balance of {address}: {} ETH ({wei} wei)", format_ether(wei));
    Ok(())
}

/// Send `amount_wei` from the configured wallet to `to`.
pub async fn transfer(config: &AppConfig, to: &str, amount_wei: &str, wait: bool) -> BlockchainResult<()> {
    let (client, builder) = signer(config).await?;
    let tx = builder.transfer(to, amount_wei).await?;

    println!("Sending {amount_wei} wei from {} to {to}", builder.address());
    submit(config, client, &tx, wait).await.map(|_| ())
}

/// Deploy the Counter contract.
pub async fn counter_deploy(config: &AppConfig, wait: bool) -> BlockchainResult<()> {
    let (client, builder) = signer(config).await?;
    let (tx, address) = builder.deployment(counter::deployment_code()?).await?;

    println!("Counter contract address: {address}");
    submit(config, client, &tx, wait).await.map(|_| ())
}

/// Print the current count of a deployed Counter.
pub async fn counter_get(config: &AppConfig, contract: &str) -> BlockchainResult<()> {
    let contract = parse_address(contract)?;
    let client = EthereumClient::connect(config.ethereum.clone()).await?;
    let count = counter::get_count(&client, contract).await?;

    println!("Counter value: {count}");
    Ok(())
}

/// Send `action` to a deployed Counter; prints the new count once confirmed.
pub async fn counter_invoke(
    config: &AppConfig,
    contract: &str,
    action: CounterAction,
    wait: bool,
) -> BlockchainResult<()> {
    let contract = parse_address(contract)?;
    let (client, builder) = signer(config).await?;
    let tx = builder.contract_call(contract, action.calldata()).await?;

    println!("Calling {}() on {contract}", action.name());
    if submit(config, client.clone(), &tx, wait).await? {
        let count = counter::get_count(&client, contract).await?;
        println!("Counter value: {count}");
    }
    Ok(())
}

async fn signer(config: &AppConfig) -> BlockchainResult<(EthereumClient, TxBuilder)> {
    let wallet = Wallet::from_config(&config.ethereum)?;
    let client = EthereumClient::connect(config.ethereum.clone()).await?;
    let builder = TxBuilder::new(client.clone(), wallet);
    builder.sync_nonce().await?;
    Ok((client, builder))
}

/// Submit and optionally wait. Returns whether a success was observed.
async fn submit(
    config: &AppConfig,
    client: EthereumClient,
    tx: &SignedTransaction,
    wait: bool,
) -> BlockchainResult<bool> {
    let watcher = SubmissionWatcher::new(
        Arc::new(client.clone()),
        RetryPolicy::from_config(&config.submission),
        CHAIN_LABEL,
    );

    let id = watcher.submit_with_retry(tx).await?;
    println!("Transaction sent: {id}");
    if let Some(base) = config.ethereum.explorer_url.as_deref() {
        println!("Explorer: {}", explorer_link(base, &format!("tx/{id}")));
    }
    if !wait {
        return Ok(false);
    }

    match watcher
        .watch_confirmation(&id, config.submission.confirmation_timeout())
        .await
    {
        Ok(event) => {
            match event.slot {
                Some(block) => println!("Transaction confirmed in block {block}"),
                None => println!("Transaction confirmed"),
            }
            Ok(true)
        }
        Err(BlockchainError::ConfirmationTimeout { id, waited }) => {
            println!("No confirmation within {}s, checking receipt", waited.as_secs());
            requery_receipt(&client, id, waited).await
        }
        Err(e) => Err(e),
    }
}

async fn requery_receipt(
    client: &EthereumClient,
    id: TxId,
    waited: std::time::Duration,
) -> BlockchainResult<bool> {
    let hash: TxHash = id
        .as_str()
        .parse()
        .map_err(|e| RpcError::rejected(format!("Invalid transaction hash '{id}': {e}")))?;

    match client.get_transaction_receipt(hash).await? {
        Some(receipt) if receipt.status() => {
            match receipt.block_number {
                Some(block) => println!("Transaction landed in block {block}"),
                None => println!("Transaction landed"),
            }
            Ok(true)
        }
        Some(_) => Err(BlockchainError::TransactionFailed {
            id,
            reason: "execution reverted".to_string(),
        }),
        None => {
            println!("Transaction {id} is still pending; its outcome is unknown");
            Err(BlockchainError::ConfirmationTimeout { id, waited })
        }
    }
}
