//! SOL transfer building and wire encoding.
//!
//! # Wire Format
//! ```text
//! transaction = short_vec(signature[64]) message
//! ```
//! The legacy message itself is compiled and serialized by `solana-message`.

use serde::Serialize;
use solana_message::Message;
use solana_short_vec::ShortU16;
use solana_system_interface::instruction as system_instruction;

use crate::blockchain::solana::keypair::{parse_pubkey, Blockhash, Pubkey};
use crate::blockchain::types::{check_amount_syntax, BlockchainError, BlockchainResult};

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// A blockhash together with the last block height at which it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentBlockhash {
    pub hash: Blockhash,
    pub last_valid_block_height: u64,
}

fn to_bincode<T: Serialize>(value: &T) -> BlockchainResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| BlockchainError::Wallet(format!("Transaction encoding failed: {e}")))
}

/// A validated, unsigned SOL transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolTransfer {
    from: Pubkey,
    to: Pubkey,
    lamports: u64,
    blockhash: RecentBlockhash,
}

impl SolTransfer {
    pub fn from(&self) -> Pubkey {
        self.from
    }

    pub fn to(&self) -> Pubkey {
        self.to
    }

    pub fn lamports(&self) -> u64 {
        self.lamports
    }

    pub fn blockhash(&self) -> RecentBlockhash {
        self.blockhash
    }

    /// Legacy message with the sender as fee payer.
    pub fn message(&self) -> Message {
        let instruction = system_instruction::transfer(&self.from, &self.to, self.lamports);
        Message::new_with_blockhash(&[instruction], Some(&self.from), &self.blockhash.hash)
    }

    /// Prefix serialized `message` with its signatures.
    pub(crate) fn encode_signed(&self, signatures: &[[u8; 64]], message: &[u8]) -> BlockchainResult<Vec<u8>> {
        let count = u16::try_from(signatures.len())
            .map_err(|_| BlockchainError::Wallet(format!("Too many signatures: {}", signatures.len())))?;

        let mut out = to_bincode(&ShortU16(count))?;
        out.reserve(signatures.len() * 64 + message.len());
        for signature in signatures {
            out.extend_from_slice(signature);
        }
        out.extend_from_slice(message);
        Ok(out)
    }
}

/// Parse a lamport amount: non-negative decimal integer fitting in u64.
pub fn parse_lamports(input: &str) -> BlockchainResult<u64> {
    let digits = check_amount_syntax(input)?;
    digits
        .parse::<u64>()
        .map_err(|_| BlockchainError::invalid_amount(input, "exceeds the lamport range"))
}

/// Build an unsigned transfer. Nothing touches the network.
pub fn build_transfer(
    sender: &str,
    receiver: &str,
    lamports: &str,
    blockhash: RecentBlockhash,
) -> BlockchainResult<SolTransfer> {
    let from = parse_pubkey(sender)?;
    let to = parse_pubkey(receiver)?;
    let lamports = parse_lamports(lamports)?;

    Ok(SolTransfer {
        from,
        to,
        lamports,
        blockhash,
    })
}

/// Format lamports as SOL with nine decimals.
pub fn format_sol(lamports: u64) -> String {
    format!(
        "{}.{:09}",
        lamports / LAMPORTS_PER_SOL,
        lamports % LAMPORTS_PER_SOL
    )
}
