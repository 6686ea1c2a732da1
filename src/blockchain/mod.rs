//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Config (endpoints, key material)
//!     → {ethereum, solana}::transaction (validate + build request)
//!     → {ethereum::wallet, solana::keypair} (sign)
//!     → watcher.rs (submit with retry, race confirmation against timeout)
//!     → adapter.rs traits, implemented per chain
//! ```
//!
//! # Security Constraints
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod adapter;
pub mod ethereum;
pub mod solana;
pub mod types;
pub mod watcher;

pub use adapter::{ConfirmationSource, ConfirmationSubscription, TransactionSubmitter};
pub use types::{
    BlockchainError, BlockchainResult, ChainId, ConfirmationEvent, ConfirmationOutcome, RpcError,
    RpcErrorKind, SignedTransaction, TxId, ValidityWindow,
};
pub use watcher::SubmissionWatcher;
