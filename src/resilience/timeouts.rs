//! Timeout enforcement for RPC calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::RpcError;

/// Run an RPC future under a deadline; expiry is a transport failure.
pub async fn with_rpc_timeout<T, F>(limit: Duration, method: &str, fut: F) -> Result<T, RpcError>
where
    F: Future<Output = Result<T, RpcError>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RpcError::transport(format!(
            "{method} timed out after {}s",
            limit.as_secs_f64()
        ))),
    }
}
