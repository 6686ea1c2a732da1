//! Ed25519 keypairs and base58 account addresses.
//!
//! Keypair files use the solana-keygen format: a JSON array of 64 bytes,
//! secret key followed by public key. Secret bytes are never logged.

use ed25519_dalek::{Signer, SigningKey};
use std::fmt;
use std::path::Path;

pub use solana_hash::Hash as Blockhash;
pub use solana_pubkey::Pubkey;

use crate::blockchain::solana::client::CHAIN_LABEL;
use crate::blockchain::solana::transaction::SolTransfer;
use crate::blockchain::types::{BlockchainError, BlockchainResult, SignedTransaction, TxId, ValidityWindow};

/// Parse a base58 address, reporting failures as `InvalidAddress`.
pub fn parse_pubkey(input: &str) -> BlockchainResult<Pubkey> {
    input
        .trim()
        .parse()
        .map_err(|e| BlockchainError::invalid_address(input, format!("{e}")))
}

/// An Ed25519 signing keypair.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Keypair from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Keypair from 64 bytes (secret || public); the halves must match.
    pub fn from_bytes(bytes: &[u8]) -> BlockchainResult<Self> {
        let bytes: &[u8; 64] = bytes.try_into().map_err(|_| {
            BlockchainError::Wallet(format!("Keypair must be 64 bytes, got {}", bytes.len()))
        })?;
        let signing_key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|_| BlockchainError::Wallet("Keypair public key does not match secret key".to_string()))?;
        Ok(Self { signing_key })
    }

    /// Parse the JSON array format written by `solana-keygen`.
    pub fn from_json(content: &str) -> BlockchainResult<Self> {
        let bytes: Vec<u8> = serde_json::from_str(content)
            .map_err(|e| BlockchainError::Wallet(format!("Invalid keypair file: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Read a solana-keygen keypair file.
    pub fn read_from_file(path: &Path) -> BlockchainResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BlockchainError::Wallet(format!("Cannot read keypair file {}: {e}", path.display()))
        })?;
        let keypair = Self::from_json(&content)?;

        tracing::info!(pubkey = %keypair.pubkey(), "Keypair loaded");
        Ok(keypair)
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign_message(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Sign a built transfer into its wire form.
    ///
    /// The transaction id is the base58 fee-payer signature.
    pub fn sign_transfer(&self, transfer: &SolTransfer) -> BlockchainResult<SignedTransaction> {
        if transfer.from() != self.pubkey() {
            return Err(BlockchainError::Wallet(format!(
                "Transfer payer {} does not match keypair {}",
                transfer.from(),
                self.pubkey()
            )));
        }

        let message = transfer.message().serialize();
        let signature = self.sign_message(&message);
        let raw = transfer.encode_signed(&[signature], &message)?;
        let id = TxId::new(bs58::encode(signature).into_string());

        tracing::debug!(tx_id = %id, blockhash = %transfer.blockhash().hash, "Transfer signed");
        Ok(SignedTransaction::new(
            CHAIN_LABEL,
            id,
            raw,
            ValidityWindow::BlockHeight(transfer.blockhash().last_valid_block_height),
        ))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair").field("pubkey", &self.pubkey()).finish()
    }
}
