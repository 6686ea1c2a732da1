//! Command flows behind the CLI.
//!
//! Each flow loads what it needs from [`AppConfig`](crate::config::AppConfig),
//! builds and signs, hands the transaction to the
//! [`SubmissionWatcher`](crate::blockchain::SubmissionWatcher) and prints the
//! result. Dropping a flow future releases any open subscription.

pub mod ethereum;
pub mod solana;

/// Join an explorer base URL and a path, ignoring a trailing slash.
pub(crate) fn explorer_link(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explorer_link() {
        assert_eq!(
            explorer_link("https://sepolia.etherscan.io/", "/tx/0xabc"),
            "https://sepolia.etherscan.io/tx/0xabc"
        );
        assert_eq!(
            explorer_link("https://explorer.solana.com", "tx/5sig?cluster=devnet"),
            "https://explorer.solana.com/tx/5sig?cluster=devnet"
        );
    }
}
