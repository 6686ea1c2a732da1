//! Wallet management and transaction signing.
//!
//! # Security
//! - Private keys come from `DAPP_ETH_PRIVATE_KEY` or the config file
//! - Keys are never logged or serialized

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::blockchain::ethereum::client::CHAIN_LABEL;
use crate::blockchain::ethereum::transaction::EthTransfer;
use crate::blockchain::types::{BlockchainError, BlockchainResult, SignedTransaction, TxId};
use crate::config::EthereumConfig;

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "DAPP_ETH_PRIVATE_KEY";

/// Wallet for transaction signing with nonce management.
#[derive(Debug)]
pub struct Wallet {
    /// The underlying signer (private key).
    signer: PrivateKeySigner,
    /// Next nonce for sequential transactions.
    nonce: Arc<AtomicU64>,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for transaction signing
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Wallet initialized"
        );

        Ok(Self {
            signer,
            nonce: Arc::new(AtomicU64::new(0)),
            chain_id,
        })
    }

    /// Load the key from `DAPP_ETH_PRIVATE_KEY`, falling back to `ethereum.private_key`.
    pub fn from_config(config: &EthereumConfig) -> BlockchainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| config.private_key.clone())
            .ok_or_else(|| {
                BlockchainError::Wallet(format!(
                    "No private key: set {} or ethereum.private_key",
                    PRIVATE_KEY_ENV_VAR
                ))
            })?;

        Self::from_private_key(&private_key, config.chain_id)
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the chain ID this wallet is configured for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Get and increment the nonce atomically.
    ///
    /// This ensures sequential transactions don't collide.
    pub fn get_and_increment_nonce(&self) -> u64 {
        self.nonce.fetch_add(1, Ordering::SeqCst)
    }

    /// Set the nonce to a specific value (e.g., after querying from chain).
    pub fn set_nonce(&self, nonce: u64) {
        self.nonce.store(nonce, Ordering::SeqCst);
    }

    /// Get current nonce without incrementing.
    pub fn current_nonce(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }

    /// Sign a built transaction into its EIP-2718 wire form.
    pub async fn sign_transfer(&self, transfer: &EthTransfer) -> BlockchainResult<SignedTransaction> {
        if transfer.from() != self.address() {
            return Err(BlockchainError::Wallet(format!(
                "Transaction sender {} does not match wallet {}",
                transfer.from(),
                self.address()
            )));
        }
        if transfer.chain_id() != self.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.chain_id,
                actual: transfer.chain_id(),
            });
        }

        let wallet = EthereumWallet::from(self.signer.clone());
        let envelope = transfer
            .to_request()
            .build(&wallet)
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Signing failed: {}", e)))?;

        let hash = *envelope.tx_hash();
        let raw = envelope.encoded_2718();

        tracing::debug!(tx_hash = %hash, nonce = transfer.nonce(), "Transaction signed");
        Ok(SignedTransaction::new(
            CHAIN_LABEL,
            TxId::new(format!("{hash:#x}")),
            raw,
            transfer.window(),
        ))
    }
}

impl Clone for Wallet {
    fn clone(&self) -> Self {
        Self {
            signer: self.signer.clone(),
            nonce: self.nonce.clone(),
            chain_id: self.chain_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::ethereum::transaction::{build_transfer, EthFees};
    use crate::blockchain::types::ValidityWindow;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn fees() -> EthFees {
        EthFees {
            gas_price: 1_000_000_000,
            gas_limit: 21_000,
        }
    }

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 1).unwrap();
        assert_eq!(wallet.address().to_string().to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_wallet_with_0x_prefix() {
        let wallet = Wallet::from_private_key(&format!("0x{}", TEST_PRIVATE_KEY), 1).unwrap();
        assert_eq!(wallet.address().to_string().to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_wallet_from_config_fallback() {
        let config = EthereumConfig {
            private_key: Some(TEST_PRIVATE_KEY.to_string()),
            ..EthereumConfig::default()
        };
        // The environment variable is not set by the test harness.
        if std::env::var(PRIVATE_KEY_ENV_VAR).is_err() {
            let wallet = Wallet::from_config(&config).unwrap();
            assert_eq!(wallet.chain_id(), 11_155_111);
            assert_eq!(wallet.address().to_string().to_lowercase(), TEST_ADDRESS);
        }
    }

    #[test]
    fn test_nonce_management() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 1).unwrap();

        assert_eq!(wallet.current_nonce(), 0);
        assert_eq!(wallet.get_and_increment_nonce(), 0);
        assert_eq!(wallet.get_and_increment_nonce(), 1);
        assert_eq!(wallet.current_nonce(), 2);

        wallet.set_nonce(100);
        assert_eq!(wallet.current_nonce(), 100);
    }

    #[test]
    fn test_invalid_private_key() {
        let result = Wallet::from_private_key("invalid_key", 1);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }

    #[tokio::test]
    async fn test_sign_transfer() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 31337).unwrap();
        let transfer = build_transfer(
            TEST_ADDRESS,
            "0x78090ebB7d05CdAFAfD8953b5358D04C26865582",
            "1000",
            4,
            fees(),
            31337,
        )
        .unwrap();

        let signed = wallet.sign_transfer(&transfer).await.unwrap();
        assert_eq!(signed.chain(), "ethereum");
        assert!(signed.id().as_str().starts_with("0x"));
        assert_eq!(signed.id().as_str().len(), 66);
        assert!(!signed.raw().is_empty());
        assert!(matches!(signed.window(), ValidityWindow::Nonce { nonce: 4, .. }));

        // Deterministic signatures: same input, same bytes.
        let again = wallet.sign_transfer(&transfer).await.unwrap();
        assert_eq!(signed, again);
    }

    #[tokio::test]
    async fn test_sign_rejects_foreign_sender() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 1).unwrap();
        let transfer = build_transfer(
            "0x78090ebB7d05CdAFAfD8953b5358D04C26865582",
            TEST_ADDRESS,
            "1",
            0,
            fees(),
            1,
        )
        .unwrap();

        let err = wallet.sign_transfer(&transfer).await.unwrap_err();
        assert!(matches!(err, BlockchainError::Wallet(_)));
    }
}
