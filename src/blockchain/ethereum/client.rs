//! Ethereum JSON-RPC client with timeout and failover.
//!
//! # Responsibilities
//! - Connect to the primary endpoint plus optional failovers
//! - Query chain state (blocks, balances, nonces, gas, receipts)
//! - Broadcast raw transactions on the primary endpoint only
//! - Classify node errors into [`RpcErrorKind`]

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::TransportError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::blockchain::adapter::{ConfirmationSource, ConfirmationSubscription, TransactionSubmitter};
use crate::blockchain::ethereum::transaction::{EthFees, ReceiptSubscription};
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainId, RpcError, RpcErrorKind, SignedTransaction, TxId,
    ValidityWindow,
};
use crate::config::EthereumConfig;
use crate::resilience::with_rpc_timeout;

/// Label used in logs and metrics.
pub const CHAIN_LABEL: &str = "ethereum";

/// Header fields of a block, as printed by the `block` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSummary {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: u64,
    pub transaction_count: usize,
    pub difficulty: U256,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub miner: Address,
}

/// Ethereum RPC client wrapper with failover support.
#[derive(Clone)]
pub struct EthereumClient {
    /// List of providers (primary + failovers).
    providers: Vec<Arc<dyn Provider + Send + Sync>>,
    /// Configuration.
    config: EthereumConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl EthereumClient {
    /// Create a new client. Fails only on an unparseable primary URL.
    pub fn new(config: EthereumConfig) -> BlockchainResult<Self> {
        let timeout_duration = config.rpc_timeout();
        let mut providers = Vec::new();

        let endpoint = config.endpoint();
        let primary_url: url::Url = endpoint.parse().map_err(|e| {
            RpcError::transport(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(
            Arc::new(ProviderBuilder::new().connect_http(primary_url)) as Arc<dyn Provider + Send + Sync>
        );

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(
                    Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>
                );
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        Ok(Self {
            providers,
            config,
            timeout_duration,
        })
    }

    /// Create a client and verify the remote chain ID.
    pub async fn connect(config: EthereumConfig) -> BlockchainResult<Self> {
        let client = Self::new(config)?;
        client.verify_chain_id().await?;

        tracing::info!(
            rpc_url = %client.config.rpc_url,
            chain_id = client.config.chain_id,
            failovers = client.providers.len() - 1,
            "Ethereum client connected"
        );
        Ok(client)
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Run a read-only query against each provider in order until one answers.
    ///
    /// Only transport failures move on to the next provider; a node that
    /// answered with an error is authoritative.
    async fn query<T, F, Fut>(&self, method: &'static str, call: F) -> BlockchainResult<T>
    where
        F: Fn(Arc<dyn Provider + Send + Sync>) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut last_error = None;
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = async { call(provider.clone()).await.map_err(classify_error) };
            match with_rpc_timeout(self.timeout_duration, method, fut).await {
                Ok(result) => return Ok(result),
                Err(e) if e.kind != RpcErrorKind::Transport => {
                    tracing::debug!(provider_idx = i, method, error = %e, "Node rejected request");
                    return Err(e.into());
                }
                Err(e) => {
                    tracing::warn!(provider_idx = i, method, error = %e, "RPC error, trying next provider");
                    last_error = Some(e);
                }
            }
        }
        let message = match last_error {
            Some(e) => format!("All RPC providers failed for {method}: {e}"),
            None => format!("All RPC providers failed for {method}"),
        };
        Err(RpcError::transport(message).into())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.query("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.query("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await
    }

    /// Get the header summary of the latest block.
    pub async fn get_latest_block(&self) -> BlockchainResult<BlockSummary> {
        let block = self
            .query("eth_getBlockByNumber", |p| async move {
                p.get_block_by_number(BlockNumberOrTag::Latest).await
            })
            .await?
            .ok_or_else(|| RpcError::transport("Node returned no latest block"))?;

        Ok(BlockSummary {
            number: block.header.number,
            hash: block.header.hash,
            parent_hash: block.header.parent_hash,
            timestamp: block.header.timestamp,
            transaction_count: block.transactions.len(),
            difficulty: block.header.difficulty,
            gas_limit: block.header.gas_limit,
            gas_used: block.header.gas_used,
            miner: block.header.beneficiary,
        })
    }

    /// Get the balance of an address.
    pub async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.query("eth_getBalance", |p| async move { p.get_balance(address).await })
            .await
    }

    /// Get the pending transaction count (next usable nonce).
    pub async fn get_pending_nonce(&self, address: Address) -> BlockchainResult<u64> {
        self.query("eth_getTransactionCount", |p| async move {
            p.get_transaction_count(address).pending().await
        })
        .await
    }

    /// Get the mined transaction count for an address.
    pub async fn get_mined_nonce(&self, address: Address) -> BlockchainResult<u64> {
        self.query("eth_getTransactionCount", |p| async move {
            p.get_transaction_count(address).latest().await
        })
        .await
    }

    /// Get a transaction receipt by hash.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<TransactionReceipt>> {
        self.query("eth_getTransactionReceipt", |p| async move {
            p.get_transaction_receipt(tx_hash).await
        })
        .await
    }

    /// Get current gas price in wei.
    pub async fn get_gas_price(&self) -> BlockchainResult<u128> {
        self.query("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await
    }

    /// Estimate gas for a transaction skeleton.
    pub async fn estimate_gas(&self, request: TransactionRequest) -> BlockchainResult<u64> {
        self.query("eth_estimateGas", |p| {
            let request = request.clone();
            async move { p.estimate_gas(request).await }
        })
        .await
    }

    /// Execute a read-only call.
    pub async fn call(&self, request: TransactionRequest) -> BlockchainResult<Bytes> {
        self.query("eth_call", |p| {
            let request = request.clone();
            async move { p.call(request).await }
        })
        .await
    }

    /// Suggest fee parameters for a transaction skeleton.
    ///
    /// The gas price gets the configured multiplier and the result is capped
    /// by `max_gas_price_gwei`; the gas limit comes from `eth_estimateGas`.
    pub async fn suggest_fees(&self, skeleton: TransactionRequest) -> BlockchainResult<EthFees> {
        let gas_price = self.get_gas_price().await?;
        let adjusted_gas_price = (gas_price as f64 * self.config.gas_price_multiplier) as u128;

        // The cap applies to the price that will actually be signed.
        if adjusted_gas_price > self.config.max_gas_price_gwei as u128 * 1_000_000_000 {
            return Err(BlockchainError::GasPriceTooHigh {
                current_gwei: u64::try_from(adjusted_gas_price / 1_000_000_000).unwrap_or(u64::MAX),
                max_gwei: self.config.max_gas_price_gwei,
            });
        }

        let gas_limit = self.estimate_gas(skeleton).await?;

        tracing::debug!(gas_price = adjusted_gas_price, gas_limit, "Fees suggested");
        Ok(EthFees {
            gas_price: adjusted_gas_price,
            gas_limit,
        })
    }

    /// Check if the chain is reachable.
    pub async fn is_healthy(&self) -> bool {
        self.get_block_number().await.is_ok()
    }

    /// Get the configuration.
    pub fn config(&self) -> &EthereumConfig {
        &self.config
    }

    /// Get the number of confirmation blocks required.
    pub fn confirmation_blocks(&self) -> u32 {
        self.config.confirmation_blocks
    }
}

#[async_trait]
impl TransactionSubmitter for EthereumClient {
    async fn submit(&self, tx: &SignedTransaction) -> Result<TxId, RpcError> {
        let provider = self.providers[0].clone();
        let raw = tx.raw().to_vec();

        let fut = async move {
            provider
                .send_raw_transaction(&raw)
                .await
                .map(|pending| *pending.tx_hash())
                .map_err(classify_error)
        };
        let hash = with_rpc_timeout(self.timeout_duration, "eth_sendRawTransaction", fut).await?;
        Ok(TxId::new(format!("{hash:#x}")))
    }

    async fn reference_expired(&self, window: &ValidityWindow) -> Result<bool, RpcError> {
        match window {
            ValidityWindow::Nonce { sender, nonce } => {
                let sender: Address = sender
                    .parse()
                    .map_err(|e| RpcError::rejected(format!("Invalid sender '{sender}': {e}")))?;
                let mined = self.get_mined_nonce(sender).await.map_err(into_rpc_error)?;
                Ok(mined > *nonce)
            }
            ValidityWindow::BlockHeight(last_valid) => {
                let height = self.get_block_number().await.map_err(into_rpc_error)?;
                Ok(height > *last_valid)
            }
        }
    }
}

#[async_trait]
impl ConfirmationSource for EthereumClient {
    async fn subscribe(&self, id: &TxId) -> Result<Box<dyn ConfirmationSubscription>, RpcError> {
        let hash: TxHash = id
            .as_str()
            .parse()
            .map_err(|e| RpcError::rejected(format!("Invalid transaction hash '{id}': {e}")))?;
        Ok(Box::new(ReceiptSubscription::new(
            self.clone(),
            id.clone(),
            hash,
            self.config.poll_interval(),
        )))
    }
}

fn into_rpc_error(err: BlockchainError) -> RpcError {
    match err {
        BlockchainError::Rpc(e) => e,
        other => RpcError::transport(other.to_string()),
    }
}

/// Map a node error onto the shared classification.
///
/// Execution clients report every submission failure as `-32000` with a
/// free-text message, so the message is inspected here and nowhere else.
pub fn classify_error(err: TransportError) -> RpcError {
    match err.as_error_resp() {
        Some(payload) => classify_node_message(payload.code, &payload.message),
        None => RpcError::transport(err.to_string()),
    }
}

/// Classify a JSON-RPC error object returned by an execution client.
pub fn classify_node_message(code: i64, message: &str) -> RpcError {
    let lower = message.to_ascii_lowercase();
    let kind = if lower.contains("nonce too low") {
        RpcErrorKind::ReferenceExpired
    } else if lower.contains("header not found") || lower.contains("unknown block") {
        RpcErrorKind::ReferenceNotFound
    } else if lower.contains("insufficient funds") {
        RpcErrorKind::InsufficientFunds
    } else if lower.contains("invalid sender") || lower.contains("invalid signature") {
        RpcErrorKind::InvalidSignature
    } else {
        RpcErrorKind::Rejected
    };
    RpcError::new(kind, format!("{message} (code {code})"))
}

impl std::fmt::Debug for EthereumClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthereumClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
