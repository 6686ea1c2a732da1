//! Solana HTTP JSON-RPC client.
//!
//! Node errors are classified by their structured payload
//! (`error.code` and `error.data.err`), never by message text.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use solana_message::Message;

use crate::blockchain::solana::keypair::{Blockhash, Pubkey};
use crate::blockchain::solana::transaction::RecentBlockhash;
use crate::blockchain::types::{BlockchainResult, RpcError, RpcErrorKind, TxId};
use crate::config::{Commitment, SolanaConfig};
use crate::resilience::with_rpc_timeout;

/// Chain label used in logs and metrics.
pub const CHAIN_LABEL: &str = "solana";

/// Preflight simulation failed; `data.err` carries the transaction error.
const SEND_TRANSACTION_PREFLIGHT_FAILURE: i64 = -32002;
/// Signature verification failed before simulation.
const TRANSACTION_SIGNATURE_VERIFICATION_FAILURE: i64 = -32003;
/// The node is behind the cluster.
const NODE_UNHEALTHY: i64 = -32005;
/// The node has not reached the requested context slot.
const MIN_CONTEXT_SLOT_NOT_REACHED: i64 = -32016;

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlockhash {
    blockhash: String,
    last_valid_block_height: u64,
}

/// Entry of a `getSignatureStatuses` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    pub confirmations: Option<u64>,
    pub err: Option<Value>,
    pub confirmation_status: Option<String>,
}

/// HTTP JSON-RPC client for one Solana endpoint.
pub struct SolanaRpcClient {
    http: reqwest::Client,
    url: String,
    commitment: Commitment,
    timeout_duration: Duration,
    next_id: AtomicU64,
}

impl SolanaRpcClient {
    pub fn new(config: &SolanaConfig) -> BlockchainResult<Self> {
        Self::with_endpoint(config.rpc_endpoint(), config.commitment, config.rpc_timeout())
    }

    pub fn with_endpoint(url: &str, commitment: Commitment, timeout: Duration) -> BlockchainResult<Self> {
        url::Url::parse(url).map_err(|e| RpcError::transport(format!("Invalid RPC URL '{url}': {e}")))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RpcError::transport(format!("Failed to build HTTP client: {e}")))?;

        tracing::info!(url = %url, commitment = commitment.as_str(), "Solana RPC client created");
        Ok(Self {
            http,
            url: url.to_string(),
            commitment,
            timeout_duration: timeout,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    async fn request<T: DeserializeOwned>(&self, method: &'static str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let call = async {
            let response = self
                .http
                .post(&self.url)
                .json(&body)
                .send()
                .await
                .map_err(|e| RpcError::transport(format!("{method}: {e}")))?;
            let status = response.status();
            let envelope: RpcResponse<T> = response
                .json()
                .await
                .map_err(|e| RpcError::transport(format!("{method}: invalid response (HTTP {status}): {e}")))?;

            if let Some(error) = envelope.error {
                let classified = classify_error(&error);
                tracing::debug!(method, code = error.code, kind = %classified.kind, "RPC error");
                return Err(classified);
            }
            envelope
                .result
                .ok_or_else(|| RpcError::transport(format!("{method}: response has neither result nor error")))
        };

        with_rpc_timeout(self.timeout_duration, method, call).await
    }

    fn commitment_config(&self) -> Value {
        json!({ "commitment": self.commitment.as_str() })
    }

    pub async fn get_latest_blockhash(&self) -> Result<RecentBlockhash, RpcError> {
        let response: WithContext<LatestBlockhash> = self
            .request("getLatestBlockhash", json!([self.commitment_config()]))
            .await?;
        let hash: Blockhash = response
            .value
            .blockhash
            .parse()
            .map_err(|e| RpcError::transport(format!("getLatestBlockhash: bad blockhash: {e}")))?;

        Ok(RecentBlockhash {
            hash,
            last_valid_block_height: response.value.last_valid_block_height,
        })
    }

    pub async fn get_block_height(&self) -> Result<u64, RpcError> {
        self.request("getBlockHeight", json!([self.commitment_config()]))
            .await
    }

    /// Balance in lamports.
    pub async fn get_balance(&self, account: &Pubkey) -> Result<u64, RpcError> {
        let response: WithContext<u64> = self
            .request(
                "getBalance",
                json!([account.to_string(), self.commitment_config()]),
            )
            .await?;
        Ok(response.value)
    }

    /// Fee in lamports for `message`, `None` if its blockhash has expired.
    pub async fn get_fee_for_message(&self, message: &Message) -> Result<Option<u64>, RpcError> {
        let encoded = BASE64.encode(message.serialize());
        let response: WithContext<Option<u64>> = self
            .request("getFeeForMessage", json!([encoded, self.commitment_config()]))
            .await?;
        Ok(response.value)
    }

    /// Ask the cluster faucet for lamports; returns the airdrop signature.
    pub async fn request_airdrop(&self, account: &Pubkey, lamports: u64) -> Result<TxId, RpcError> {
        let signature: String = self
            .request(
                "requestAirdrop",
                json!([account.to_string(), lamports, self.commitment_config()]),
            )
            .await?;
        Ok(TxId::new(signature))
    }

    /// Submit wire bytes; preflight runs at the configured commitment.
    pub async fn send_transaction(&self, raw: &[u8]) -> Result<TxId, RpcError> {
        let signature: String = self
            .request(
                "sendTransaction",
                json!([
                    BASE64.encode(raw),
                    {
                        "encoding": "base64",
                        "preflightCommitment": self.commitment.as_str(),
                    }
                ]),
            )
            .await?;
        Ok(TxId::new(signature))
    }

    /// Status of one signature; `None` if the node has not seen it.
    pub async fn get_signature_status(&self, id: &TxId) -> Result<Option<SignatureStatus>, RpcError> {
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .request(
                "getSignatureStatuses",
                json!([[id.as_str()], { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }

    pub async fn is_healthy(&self) -> bool {
        self.get_block_height().await.is_ok()
    }
}

impl std::fmt::Debug for SolanaRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaRpcClient")
            .field("url", &self.url)
            .field("commitment", &self.commitment)
            .finish()
    }
}

/// Map a JSON-RPC error object to an [`RpcErrorKind`].
pub fn classify_error(error: &RpcErrorObject) -> RpcError {
    let tx_err = error.data.as_ref().and_then(|data| data.get("err"));
    let kind = match tx_err {
        Some(err) if !err.is_null() => classify_transaction_error(err),
        _ => match error.code {
            TRANSACTION_SIGNATURE_VERIFICATION_FAILURE => RpcErrorKind::InvalidSignature,
            NODE_UNHEALTHY | MIN_CONTEXT_SLOT_NOT_REACHED => RpcErrorKind::ReferenceNotFound,
            SEND_TRANSACTION_PREFLIGHT_FAILURE => RpcErrorKind::Rejected,
            _ => RpcErrorKind::Rejected,
        },
    };

    RpcError::new(kind, format!("{} (code {})", error.message, error.code))
}

/// Classify a `TransactionError` as serialized by the node: either a bare
/// string (`"BlockhashNotFound"`) or a single-key object
/// (`{"InsufficientFundsForRent": {"account_index": 0}}`).
fn classify_transaction_error(err: &Value) -> RpcErrorKind {
    let name = match err {
        Value::String(name) => name.as_str(),
        Value::Object(map) => map.keys().next().map(String::as_str).unwrap_or_default(),
        _ => "",
    };

    match name {
        "BlockhashNotFound" => RpcErrorKind::ReferenceNotFound,
        "TransactionExpiredBlockheightExceeded" => RpcErrorKind::ReferenceExpired,
        "InsufficientFundsForFee" | "InsufficientFundsForRent" => RpcErrorKind::InsufficientFunds,
        "SignatureFailure" | "MissingSignatureForFee" => RpcErrorKind::InvalidSignature,
        "InstructionError" if is_system_insufficient_lamports(err) => RpcErrorKind::InsufficientFunds,
        _ => RpcErrorKind::Rejected,
    }
}

/// `{"InstructionError": [i, {"Custom": 1}]}`: the system program's
/// `ResultWithNegativeLamports`, raised when the sender cannot cover the transfer.
fn is_system_insufficient_lamports(err: &Value) -> bool {
    err.get("InstructionError")
        .and_then(|detail| detail.get(1))
        .and_then(|inner| inner.get("Custom"))
        .and_then(Value::as_u64)
        == Some(1)
}
