//! Chain-neutral types and error definitions.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Identifier of a signed transaction: a `0x` hash on Ethereum, a base58
/// signature on Solana. Known before the first submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxId(String);

impl TxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The freshness token a signed transaction was built against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidityWindow {
    /// Valid while the chain's block height is at most this value.
    BlockHeight(u64),
    /// Valid while `sender` has not yet used `nonce`.
    Nonce { sender: String, nonce: u64 },
}

impl fmt::Display for ValidityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidityWindow::BlockHeight(height) => write!(f, "last valid block height {height}"),
            ValidityWindow::Nonce { sender, nonce } => write!(f, "nonce {nonce} of {sender}"),
        }
    }
}

/// A signed, serialized transaction. Retries resend exactly these bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    chain: &'static str,
    id: TxId,
    raw: Vec<u8>,
    window: ValidityWindow,
}

impl SignedTransaction {
    pub fn new(chain: &'static str, id: TxId, raw: Vec<u8>, window: ValidityWindow) -> Self {
        Self {
            chain,
            id,
            raw,
            window,
        }
    }

    /// Short chain label used in logs and metrics.
    pub fn chain(&self) -> &'static str {
        self.chain
    }

    pub fn id(&self) -> &TxId {
        &self.id
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn window(&self) -> &ValidityWindow {
        &self.window
    }
}

/// On-chain result carried by a confirmation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Success,
    Failed(String),
}

/// Notification that a submitted transaction was processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationEvent {
    pub id: TxId,
    /// Slot (Solana) or block number (Ethereum) the transaction landed in.
    pub slot: Option<u64>,
    pub outcome: ConfirmationOutcome,
}

/// Structured classification of an RPC failure.
///
/// Adapters translate their native errors into one of these kinds so that
/// retry decisions never depend on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorKind {
    /// The referenced blockhash/nonce is not (yet) visible to the node.
    ReferenceNotFound,
    /// The referenced blockhash/nonce has left its validity window.
    ReferenceExpired,
    /// The sender cannot pay for the transfer or fees.
    InsufficientFunds,
    /// Signature verification failed.
    InvalidSignature,
    /// Any other chain-side rejection.
    Rejected,
    /// Connection, timeout or decoding failure.
    Transport,
}

impl RpcErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RpcErrorKind::ReferenceNotFound => "reference not found",
            RpcErrorKind::ReferenceExpired => "reference expired",
            RpcErrorKind::InsufficientFunds => "insufficient funds",
            RpcErrorKind::InvalidSignature => "invalid signature",
            RpcErrorKind::Rejected => "rejected",
            RpcErrorKind::Transport => "transport",
        }
    }
}

impl fmt::Display for RpcErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An RPC failure as reported by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RpcError {
    pub kind: RpcErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn new(kind: RpcErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(RpcErrorKind::Transport, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(RpcErrorKind::Rejected, message)
    }

    /// Only a stale or not-yet-visible freshness token is worth resending.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            RpcErrorKind::ReferenceNotFound | RpcErrorKind::ReferenceExpired
        )
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Address is not valid for the target chain.
    #[error("Invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    /// Amount is negative, malformed or out of range.
    #[error("Invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: String },

    /// Fatal chain-side rejection; not retried.
    #[error("Submission rejected after {attempts} attempt(s): {source}")]
    SubmissionRejected { attempts: u32, source: RpcError },

    /// Every attempt hit a retryable error.
    #[error("Submission failed after {attempts} attempt(s), last error: {last_error}")]
    SubmissionExhausted { attempts: u32, last_error: RpcError },

    /// The freshness token expired; resending the same bytes cannot succeed.
    #[error("Transaction reference expired after {attempts} attempt(s): {detail}")]
    ReferenceExpired { attempts: u32, detail: String },

    /// Transaction executed and failed on-chain.
    #[error("Transaction {id} failed on-chain: {reason}")]
    TransactionFailed { id: TxId, reason: String },

    /// No confirmation observed in time. The outcome is unknown.
    #[error("Transaction {id} not confirmed within {waited:?}; re-query chain state")]
    ConfirmationTimeout { id: TxId, waited: Duration },

    /// Subscription ended without delivering an event.
    #[error("Confirmation subscription for {0} closed without an event")]
    SubscriptionClosed(TxId),

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// The configured network does not offer this operation.
    #[error("{operation} is not available on {network}")]
    Unsupported { operation: &'static str, network: String },
}

impl BlockchainError {
    pub fn invalid_address(input: &str, reason: impl fmt::Display) -> Self {
        Self::InvalidAddress {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_amount(input: &str, reason: impl fmt::Display) -> Self {
        Self::InvalidAmount {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Caller-side input errors, detected before any network call.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            BlockchainError::InvalidAddress { .. } | BlockchainError::InvalidAmount { .. }
        )
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Reject empty, signed or non-decimal amount strings before numeric parsing.
pub(crate) fn check_amount_syntax(input: &str) -> BlockchainResult<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(BlockchainError::invalid_amount(input, "amount is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(BlockchainError::invalid_amount(input, "amount must not be negative"));
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BlockchainError::invalid_amount(
            input,
            "amount must be a whole number of base units",
        ));
    }
    Ok(trimmed)
}
