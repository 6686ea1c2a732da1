//! Ethereum adapter.
//!
//! # Data Flow
//! ```text
//! Private key (env / config)
//!     → wallet.rs (signer, nonce tracking, EIP-155 signing)
//!     → client.rs (RPC connection with timeouts and failover)
//!     → transaction.rs (validate, build, sign; receipt polling)
//!     → counter.rs (Counter contract calldata and reads)
//! ```

pub mod client;
pub mod counter;
pub mod transaction;
pub mod wallet;

pub use client::{BlockSummary, EthereumClient};
pub use counter::CounterAction;
pub use transaction::{EthFees, EthTransfer, TxBuilder};
pub use wallet::Wallet;
