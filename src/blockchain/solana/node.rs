//! Solana adapter for the submission watcher: HTTP for submission,
//! WebSocket for confirmations.

use async_trait::async_trait;

use crate::blockchain::adapter::{ConfirmationSource, ConfirmationSubscription, TransactionSubmitter};
use crate::blockchain::solana::client::SolanaRpcClient;
use crate::blockchain::solana::pubsub::SolanaPubsub;
use crate::blockchain::types::{BlockchainResult, RpcError, SignedTransaction, TxId, ValidityWindow};
use crate::config::SolanaConfig;

#[derive(Debug)]
pub struct SolanaNode {
    rpc: SolanaRpcClient,
    pubsub: SolanaPubsub,
}

impl SolanaNode {
    pub fn new(config: &SolanaConfig) -> BlockchainResult<Self> {
        Ok(Self::from_parts(SolanaRpcClient::new(config)?, SolanaPubsub::new(config)))
    }

    pub fn from_parts(rpc: SolanaRpcClient, pubsub: SolanaPubsub) -> Self {
        Self { rpc, pubsub }
    }

    pub fn rpc(&self) -> &SolanaRpcClient {
        &self.rpc
    }

    pub fn pubsub(&self) -> &SolanaPubsub {
        &self.pubsub
    }
}

#[async_trait]
impl TransactionSubmitter for SolanaNode {
    async fn submit(&self, tx: &SignedTransaction) -> Result<TxId, RpcError> {
        let id = self.rpc.send_transaction(tx.raw()).await?;
        if &id != tx.id() {
            tracing::warn!(expected = %tx.id(), returned = %id, "Node returned a different signature");
        }
        Ok(id)
    }

    async fn reference_expired(&self, window: &ValidityWindow) -> Result<bool, RpcError> {
        match window {
            ValidityWindow::BlockHeight(last_valid) => {
                let height = self.rpc.get_block_height().await?;
                Ok(height > *last_valid)
            }
            ValidityWindow::Nonce { .. } => Err(RpcError::rejected(
                "nonce windows do not apply to Solana transactions",
            )),
        }
    }
}

#[async_trait]
impl ConfirmationSource for SolanaNode {
    async fn subscribe(&self, id: &TxId) -> Result<Box<dyn ConfirmationSubscription>, RpcError> {
        let subscription = self.pubsub.signature_subscribe(id).await?;
        Ok(Box::new(subscription))
    }
}
