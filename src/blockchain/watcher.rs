//! Submission and confirmation watching.
//!
//! # State Machine
//! ```text
//! Signed → Submitting ─┬─ accepted ──→ (watch) ─┬─ Confirmed
//!            ↑   │     │                        ├─ Failed (on-chain error)
//!            └───┘     └─ fatal / exhausted     └─ TimedOut (outcome unknown)
//!         retryable, budget left,
//!         reference still valid
//! ```
//!
//! # Design Decisions
//! - Retries resend the identical signed bytes
//! - Before every resend the validity window is checked; an expired
//!   reference fails fast instead of burning the budget
//! - The confirmation wait is a single race against a deadline; the
//!   subscription is released on every exit path

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use crate::blockchain::adapter::{ConfirmationSource, TransactionSubmitter};
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ConfirmationEvent, ConfirmationOutcome, SignedTransaction,
    TxId,
};
use crate::observability::metrics;
use crate::resilience::RetryPolicy;

/// Drives a signed transaction to a terminal outcome through one adapter.
pub struct SubmissionWatcher<A> {
    adapter: Arc<A>,
    policy: RetryPolicy,
    chain: &'static str,
}

impl<A> Clone for SubmissionWatcher<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            policy: self.policy,
            chain: self.chain,
        }
    }
}

impl<A> SubmissionWatcher<A>
where
    A: TransactionSubmitter + ConfirmationSource + 'static,
{
    pub fn new(adapter: Arc<A>, policy: RetryPolicy, chain: &'static str) -> Self {
        Self {
            adapter,
            policy,
            chain,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Submit with the retry budget, returning the accepted transaction id.
    ///
    /// At most `max_attempts` network submissions happen. If an attempt lands
    /// on-chain but the client sees a transient error, a later resend may be
    /// reported as a failure; callers re-query chain state in that case.
    pub async fn submit_with_retry(&self, tx: &SignedTransaction) -> BlockchainResult<TxId> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            if attempt > 1 {
                self.ensure_reference_valid(tx, attempt - 1).await?;
            }

            metrics::record_submission_attempt(self.chain);
            tracing::debug!(tx_id = %tx.id(), attempt, max_attempts, "Submitting transaction");

            match self.adapter.submit(tx).await {
                Ok(id) => {
                    metrics::record_submission_outcome(self.chain, "accepted");
                    tracing::info!(tx_id = %id, attempt, "Transaction accepted by node");
                    return Ok(id);
                }
                Err(e) if e.is_retryable() => {
                    if !self.policy.allows_retry_after(attempt) {
                        metrics::record_submission_outcome(self.chain, "exhausted");
                        tracing::error!(
                            tx_id = %tx.id(),
                            attempts = attempt,
                            error = %e,
                            "Retry budget exhausted"
                        );
                        return Err(BlockchainError::SubmissionExhausted {
                            attempts: attempt,
                            last_error: e,
                        });
                    }

                    let delay = self.policy.delay_after(attempt);
                    tracing::warn!(
                        tx_id = %tx.id(),
                        attempt,
                        max_attempts,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable submission error, retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    metrics::record_submission_outcome(self.chain, "rejected");
                    tracing::error!(tx_id = %tx.id(), attempt, error = %e, "Submission rejected");
                    return Err(BlockchainError::SubmissionRejected {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    async fn ensure_reference_valid(
        &self,
        tx: &SignedTransaction,
        attempts: u32,
    ) -> BlockchainResult<()> {
        match self.adapter.reference_expired(tx.window()).await {
            Ok(false) => Ok(()),
            Ok(true) => {
                metrics::record_submission_outcome(self.chain, "expired");
                tracing::error!(tx_id = %tx.id(), window = %tx.window(), "Reference expired, not resending");
                Err(BlockchainError::ReferenceExpired {
                    attempts,
                    detail: format!("{} has elapsed", tx.window()),
                })
            }
            Err(e) => {
                // The node rejects a stale reference anyway.
                tracing::warn!(tx_id = %tx.id(), error = %e, "Could not check reference validity");
                Ok(())
            }
        }
    }

    /// Wait for the first confirmation event, racing it against `limit`.
    ///
    /// `ConfirmationTimeout` does not mean the transaction failed.
    pub async fn watch_confirmation(
        &self,
        id: &TxId,
        limit: Duration,
    ) -> BlockchainResult<ConfirmationEvent> {
        let mut subscription = self.adapter.subscribe(id).await?;
        tracing::debug!(tx_id = %id, timeout_secs = limit.as_secs(), "Waiting for confirmation");

        let received = timeout(limit, subscription.next_event()).await;
        subscription.unsubscribe().await;

        match received {
            Ok(Some(event)) => match event.outcome {
                ConfirmationOutcome::Success => {
                    metrics::record_confirmation(self.chain, "confirmed");
                    tracing::info!(tx_id = %id, slot = ?event.slot, "Transaction confirmed");
                    Ok(event)
                }
                ConfirmationOutcome::Failed(reason) => {
                    metrics::record_confirmation(self.chain, "failed");
                    tracing::warn!(tx_id = %id, reason = %reason, "Transaction failed on-chain");
                    Err(BlockchainError::TransactionFailed {
                        id: id.clone(),
                        reason,
                    })
                }
            },
            Ok(None) => {
                metrics::record_confirmation(self.chain, "closed");
                Err(BlockchainError::SubscriptionClosed(id.clone()))
            }
            Err(_) => {
                metrics::record_confirmation(self.chain, "timeout");
                tracing::warn!(tx_id = %id, timeout_secs = limit.as_secs(), "Confirmation timed out");
                Err(BlockchainError::ConfirmationTimeout {
                    id: id.clone(),
                    waited: limit,
                })
            }
        }
    }

    /// Run [`watch_confirmation`](Self::watch_confirmation) on a background task.
    ///
    /// Aborting the handle drops the subscription, which releases it.
    pub fn spawn_confirmation_watch(
        &self,
        id: TxId,
        limit: Duration,
    ) -> JoinHandle<BlockchainResult<ConfirmationEvent>> {
        let watcher = self.clone();
        tokio::spawn(async move { watcher.watch_confirmation(&id, limit).await })
    }

    /// Submit, then wait for confirmation.
    pub async fn submit_and_confirm(
        &self,
        tx: &SignedTransaction,
        limit: Duration,
    ) -> BlockchainResult<ConfirmationEvent> {
        let id = self.submit_with_retry(tx).await?;
        self.watch_confirmation(&id, limit).await
    }
}
