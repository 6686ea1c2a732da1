//! Solana adapter.
//!
//! # Data Flow
//! ```text
//! Keypair file (solana-keygen JSON)
//!     → keypair.rs (Ed25519 signing, base58 keys)
//!     → transaction.rs (validate, system transfer message, wire encoding)
//!     → client.rs (HTTP JSON-RPC, structured error classification)
//!     → pubsub.rs (signatureSubscribe over WebSocket)
//!     → node.rs (both joined behind the watcher traits)
//! ```

pub mod client;
pub mod keypair;
pub mod node;
pub mod pubsub;
pub mod transaction;

pub use client::{SignatureStatus, SolanaRpcClient};
pub use keypair::{parse_pubkey, Blockhash, Keypair, Pubkey};
pub use node::SolanaNode;
pub use pubsub::{SignatureSubscription, SolanaPubsub};
pub use transaction::{build_transfer, format_sol, RecentBlockhash, SolTransfer, LAMPORTS_PER_SOL};
