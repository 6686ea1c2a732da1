//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Ethereum endpoint, signer and fee settings.
    pub ethereum: EthereumConfig,

    /// Solana cluster and keypair settings.
    pub solana: SolanaConfig,

    /// Submission retry and confirmation settings.
    pub submission: SubmissionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Ethereum integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EthereumConfig {
    /// JSON-RPC endpoint URL (without the API key segment).
    pub rpc_url: String,

    /// Provider API key, appended to `rpc_url` as a path segment (Infura style).
    pub api_key: Option<String>,

    /// Failover JSON-RPC endpoint URLs, used verbatim.
    pub failover_urls: Vec<String>,

    /// Chain ID (11155111 for Sepolia, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Hex-encoded private key. `DAPP_ETH_PRIVATE_KEY` takes precedence.
    pub private_key: Option<String>,

    /// Gas price multiplier (1.0 = node suggestion, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// Number of block confirmations required before a receipt counts.
    pub confirmation_blocks: u32,

    /// Receipt polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Block explorer base URL used when printing transaction links.
    pub explorer_url: Option<String>,
}

impl EthereumConfig {
    /// Primary endpoint with the API key segment applied.
    pub fn endpoint(&self) -> String {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => {
                format!("{}/{}", self.rpc_url.trim_end_matches('/'), key)
            }
            _ => self.rpc_url.clone(),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for EthereumConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://sepolia.infura.io/v3".to_string(),
            api_key: None,
            failover_urls: Vec::new(),
            chain_id: 11_155_111,
            rpc_timeout_secs: 10,
            private_key: None,
            gas_price_multiplier: 1.0,
            max_gas_price_gwei: 500,
            confirmation_blocks: 1,
            poll_interval_ms: 2000,
            explorer_url: Some("https://sepolia.etherscan.io".to_string()),
        }
    }
}

/// Public Solana clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SolanaNetwork {
    #[default]
    Devnet,
    Testnet,
    Mainnet,
}

impl SolanaNetwork {
    pub fn rpc_url(self) -> &'static str {
        match self {
            SolanaNetwork::Devnet => "https://api.devnet.solana.com",
            SolanaNetwork::Testnet => "https://api.testnet.solana.com",
            SolanaNetwork::Mainnet => "https://api.mainnet-beta.solana.com",
        }
    }

    pub fn ws_url(self) -> &'static str {
        match self {
            SolanaNetwork::Devnet => "wss://api.devnet.solana.com",
            SolanaNetwork::Testnet => "wss://api.testnet.solana.com",
            SolanaNetwork::Mainnet => "wss://api.mainnet-beta.solana.com",
        }
    }

    /// Whether the cluster serves `requestAirdrop`.
    pub fn supports_airdrop(self) -> bool {
        !matches!(self, SolanaNetwork::Mainnet)
    }
}

impl std::fmt::Display for SolanaNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SolanaNetwork::Devnet => "devnet",
            SolanaNetwork::Testnet => "testnet",
            SolanaNetwork::Mainnet => "mainnet",
        };
        f.write_str(name)
    }
}

/// Solana commitment levels accepted by the RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

/// Solana integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolanaConfig {
    /// Cluster whose public endpoints are used unless overridden.
    pub network: SolanaNetwork,

    /// HTTP JSON-RPC endpoint override.
    pub rpc_url: Option<String>,

    /// WebSocket endpoint override.
    pub ws_url: Option<String>,

    /// Path to a solana-keygen JSON keypair file.
    pub keypair_path: String,

    /// Commitment used for queries, preflight and subscriptions.
    pub commitment: Commitment,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl SolanaConfig {
    pub fn rpc_endpoint(&self) -> &str {
        self.rpc_url.as_deref().unwrap_or_else(|| self.network.rpc_url())
    }

    pub fn ws_endpoint(&self) -> &str {
        self.ws_url.as_deref().unwrap_or_else(|| self.network.ws_url())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            network: SolanaNetwork::Devnet,
            rpc_url: None,
            ws_url: None,
            keypair_path: "wallet-keypair.json".to_string(),
            commitment: Commitment::Confirmed,
            rpc_timeout_secs: 10,
        }
    }
}

/// Submission retry and confirmation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Maximum number of network submissions per signed transaction.
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds.
    pub backoff_ms: u64,

    /// Upper bound for the delay when `exponential` is set.
    pub max_backoff_ms: u64,

    /// Grow the delay exponentially (with jitter) instead of keeping it fixed.
    pub exponential: bool,

    /// How long to wait for a confirmation event, in seconds.
    pub confirmation_timeout_secs: u64,
}

impl SubmissionConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 2000,
            max_backoff_ms: 16_000,
            exponential: false,
            confirmation_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
