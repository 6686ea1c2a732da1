//! Boundary between the submission watcher and chain-specific RPC clients.
//!
//! Implementations classify every failure into an [`RpcErrorKind`] before it
//! crosses this boundary.
//!
//! [`RpcErrorKind`]: crate::blockchain::types::RpcErrorKind

use async_trait::async_trait;

use crate::blockchain::types::{ConfirmationEvent, RpcError, SignedTransaction, TxId, ValidityWindow};

/// Sends signed transactions to a node.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Broadcast the signed bytes once. Exactly one network submission.
    async fn submit(&self, tx: &SignedTransaction) -> Result<TxId, RpcError>;

    /// Whether the freshness token behind `window` can no longer be used.
    async fn reference_expired(&self, window: &ValidityWindow) -> Result<bool, RpcError>;
}

/// Opens confirmation streams keyed by transaction id.
#[async_trait]
pub trait ConfirmationSource: Send + Sync {
    async fn subscribe(&self, id: &TxId) -> Result<Box<dyn ConfirmationSubscription>, RpcError>;
}

/// A live confirmation stream.
///
/// Dropping a subscription must release its node-side state even when
/// [`unsubscribe`](ConfirmationSubscription::unsubscribe) was never awaited.
#[async_trait]
pub trait ConfirmationSubscription: Send {
    /// Next confirmation event, or `None` once the stream has ended.
    async fn next_event(&mut self) -> Option<ConfirmationEvent>;

    /// Release the subscription. Idempotent.
    async fn unsubscribe(&mut self);
}
