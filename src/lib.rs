//! Ethereum and Solana client library: transaction building, signing,
//! submission with retry and confirmation watching.

pub mod blockchain;
pub mod commands;
pub mod config;
pub mod observability;
pub mod resilience;

pub use blockchain::{BlockchainError, BlockchainResult, SubmissionWatcher};
pub use config::AppConfig;
