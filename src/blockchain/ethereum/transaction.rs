//! Transaction building and receipt-based confirmation.
//!
//! # Responsibilities
//! - Validate transfer inputs without touching the network
//! - Assemble legacy (EIP-155) transfers, contract calls and deployments
//! - Fetch nonce and fees, then hand the result to the wallet for signing
//! - Poll receipts as a confirmation stream

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::blockchain::adapter::ConfirmationSubscription;
use crate::blockchain::ethereum::client::EthereumClient;
use crate::blockchain::ethereum::wallet::Wallet;
use crate::blockchain::types::{
    check_amount_syntax, BlockchainError, BlockchainResult, ConfirmationEvent, ConfirmationOutcome,
    SignedTransaction, TxId, ValidityWindow,
};

/// Fee parameters for a legacy transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthFees {
    /// Gas price in wei.
    pub gas_price: u128,
    pub gas_limit: u64,
}

/// An unsigned Ethereum transaction. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthTransfer {
    from: Address,
    /// `None` deploys `input` as contract code.
    to: Option<Address>,
    value: U256,
    input: Bytes,
    nonce: u64,
    fees: EthFees,
    chain_id: u64,
}

impl EthTransfer {
    pub fn from(&self) -> Address {
        self.from
    }

    pub fn to(&self) -> Option<Address> {
        self.to
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn input(&self) -> &Bytes {
        &self.input
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn fees(&self) -> EthFees {
        self.fees
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Nonce window this transaction is bound to.
    pub fn window(&self) -> ValidityWindow {
        ValidityWindow::Nonce {
            sender: self.from.to_string(),
            nonce: self.nonce,
        }
    }

    /// Address the deployment will create, for transactions without `to`.
    pub fn created_address(&self) -> Option<Address> {
        match self.to {
            Some(_) => None,
            None => Some(self.from.create(self.nonce)),
        }
    }

    /// Fully specified request, ready for signing.
    pub fn to_request(&self) -> TransactionRequest {
        let request = TransactionRequest::default()
            .with_from(self.from)
            .with_value(self.value)
            .with_nonce(self.nonce)
            .with_gas_price(self.fees.gas_price)
            .with_gas_limit(self.fees.gas_limit)
            .with_chain_id(self.chain_id);

        match self.to {
            Some(to) => request.with_to(to).with_input(self.input.clone()),
            None => request.with_deploy_code(self.input.clone()),
        }
    }
}

/// Parse a 20-byte hex address, with or without `0x`.
pub fn parse_address(input: &str) -> BlockchainResult<Address> {
    let trimmed = input.trim();
    let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if hex.len() != 40 {
        return Err(BlockchainError::invalid_address(input, "expected 40 hex characters"));
    }
    hex.parse::<Address>()
        .map_err(|e| BlockchainError::invalid_address(input, e))
}

/// Parse a non-negative decimal wei amount.
pub fn parse_wei(input: &str) -> BlockchainResult<U256> {
    let digits = check_amount_syntax(input)?;
    U256::from_str_radix(digits, 10).map_err(|e| BlockchainError::invalid_amount(input, e))
}

/// Build a native-token transfer.
pub fn build_transfer(
    sender: &str,
    receiver: &str,
    amount_wei: &str,
    nonce: u64,
    fees: EthFees,
    chain_id: u64,
) -> BlockchainResult<EthTransfer> {
    Ok(EthTransfer {
        from: parse_address(sender)?,
        to: Some(parse_address(receiver)?),
        value: parse_wei(amount_wei)?,
        input: Bytes::new(),
        nonce,
        fees,
        chain_id,
    })
}

/// Build a call to a deployed contract carrying no value.
pub fn build_contract_call(
    sender: Address,
    contract: Address,
    calldata: Bytes,
    nonce: u64,
    fees: EthFees,
    chain_id: u64,
) -> EthTransfer {
    EthTransfer {
        from: sender,
        to: Some(contract),
        value: U256::ZERO,
        input: calldata,
        nonce,
        fees,
        chain_id,
    }
}

/// Build a contract deployment.
pub fn build_deployment(
    sender: Address,
    bytecode: Bytes,
    nonce: u64,
    fees: EthFees,
    chain_id: u64,
) -> EthTransfer {
    EthTransfer {
        from: sender,
        to: None,
        value: U256::ZERO,
        input: bytecode,
        nonce,
        fees,
        chain_id,
    }
}

/// Fetches fresh nonce and fees, builds and signs transactions.
pub struct TxBuilder {
    client: EthereumClient,
    wallet: Wallet,
}

impl TxBuilder {
    /// Create a new transaction builder.
    pub fn new(client: EthereumClient, wallet: Wallet) -> Self {
        Self { client, wallet }
    }

    /// Sync the wallet nonce from the chain's pending count.
    pub async fn sync_nonce(&self) -> BlockchainResult<u64> {
        let chain_nonce = self.client.get_pending_nonce(self.wallet.address()).await?;
        self.wallet.set_nonce(chain_nonce);
        Ok(chain_nonce)
    }

    fn skeleton(&self, to: Option<Address>, value: U256, input: Bytes) -> TransactionRequest {
        let request = TransactionRequest::default()
            .with_from(self.wallet.address())
            .with_value(value);
        match to {
            Some(to) => request.with_to(to).with_input(input),
            None => request.with_deploy_code(input),
        }
    }

    /// Sign a native-token transfer of `amount_wei` to `receiver`.
    pub async fn transfer(&self, receiver: &str, amount_wei: &str) -> BlockchainResult<SignedTransaction> {
        // Validate before any RPC round-trip.
        let to = parse_address(receiver)?;
        let value = parse_wei(amount_wei)?;

        let fees = self.client.suggest_fees(self.skeleton(Some(to), value, Bytes::new())).await?;
        let sender = self.wallet.address().to_string();
        let nonce = self.wallet.get_and_increment_nonce();
        let transfer = build_transfer(&sender, receiver, amount_wei, nonce, fees, self.wallet.chain_id())?;

        self.wallet.sign_transfer(&transfer).await
    }

    /// Sign a zero-value contract call.
    pub async fn contract_call(&self, contract: Address, calldata: Bytes) -> BlockchainResult<SignedTransaction> {
        let fees = self
            .client
            .suggest_fees(self.skeleton(Some(contract), U256::ZERO, calldata.clone()))
            .await?;
        let nonce = self.wallet.get_and_increment_nonce();
        let call = build_contract_call(
            self.wallet.address(),
            contract,
            calldata,
            nonce,
            fees,
            self.wallet.chain_id(),
        );

        self.wallet.sign_transfer(&call).await
    }

    /// Sign a deployment; returns the transaction and the address it creates.
    pub async fn deployment(&self, bytecode: Bytes) -> BlockchainResult<(SignedTransaction, Address)> {
        let fees = self
            .client
            .suggest_fees(self.skeleton(None, U256::ZERO, bytecode.clone()))
            .await?;
        let nonce = self.wallet.get_and_increment_nonce();
        let deployment = build_deployment(self.wallet.address(), bytecode, nonce, fees, self.wallet.chain_id());
        let address = self.wallet.address().create(nonce);

        let signed = self.wallet.sign_transfer(&deployment).await?;
        Ok((signed, address))
    }

    /// Get the wallet address.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }
}

/// Receipt polling presented as a confirmation stream.
pub struct ReceiptSubscription {
    client: EthereumClient,
    id: TxId,
    hash: TxHash,
    ticker: Interval,
    active: bool,
}

impl ReceiptSubscription {
    pub fn new(client: EthereumClient, id: TxId, hash: TxHash, poll_interval: Duration) -> Self {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            client,
            id,
            hash,
            ticker,
            active: true,
        }
    }
}

#[async_trait]
impl ConfirmationSubscription for ReceiptSubscription {
    async fn next_event(&mut self) -> Option<ConfirmationEvent> {
        let required_confirmations = u64::from(self.client.confirmation_blocks().max(1));

        while self.active {
            self.ticker.tick().await;

            let receipt = match self.client.get_transaction_receipt(self.hash).await {
                Ok(Some(r)) => r,
                Ok(None) => {
                    tracing::debug!(tx_hash = %self.hash, "Transaction pending");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(tx_hash = %self.hash, error = %e, "Receipt query failed");
                    continue;
                }
            };

            if !receipt.status() {
                return Some(ConfirmationEvent {
                    id: self.id.clone(),
                    slot: receipt.block_number,
                    outcome: ConfirmationOutcome::Failed("execution reverted".to_string()),
                });
            }

            let current_block = match self.client.get_block_number().await {
                Ok(block) => block,
                Err(e) => {
                    tracing::warn!(error = %e, "Block number query failed");
                    continue;
                }
            };
            let tx_block = receipt.block_number.unwrap_or(current_block);
            let confirmations = current_block.saturating_sub(tx_block) + 1;

            if confirmations >= required_confirmations {
                return Some(ConfirmationEvent {
                    id: self.id.clone(),
                    slot: Some(tx_block),
                    outcome: ConfirmationOutcome::Success,
                });
            }

            tracing::debug!(
                tx_hash = %self.hash,
                confirmations,
                required = required_confirmations,
                "Waiting for confirmations"
            );
        }
        None
    }

    async fn unsubscribe(&mut self) {
        if self.active {
            self.active = false;
            tracing::debug!(tx_hash = %self.hash, "Receipt polling stopped");
        }
    }
}
