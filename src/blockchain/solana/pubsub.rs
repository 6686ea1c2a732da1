//! Solana WebSocket `signatureSubscribe` support.
//!
//! Each subscription owns its own connection. Dropping the subscription
//! closes the socket, which makes the node discard it.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::blockchain::adapter::ConfirmationSubscription;
use crate::blockchain::types::{ConfirmationEvent, ConfirmationOutcome, RpcError, TxId};
use crate::config::{Commitment, SolanaConfig};
use crate::resilience::with_rpc_timeout;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SUBSCRIBE_REQUEST_ID: u64 = 1;
const UNSUBSCRIBE_REQUEST_ID: u64 = 2;

/// Opens signature subscriptions against one WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct SolanaPubsub {
    ws_url: String,
    commitment: Commitment,
    connect_timeout: Duration,
}

impl SolanaPubsub {
    pub fn new(config: &SolanaConfig) -> Self {
        Self::with_endpoint(config.ws_endpoint(), config.commitment, config.rpc_timeout())
    }

    pub fn with_endpoint(ws_url: &str, commitment: Commitment, connect_timeout: Duration) -> Self {
        Self {
            ws_url: ws_url.to_string(),
            commitment,
            connect_timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.ws_url
    }

    /// Connect and subscribe; returns once the node acknowledged the subscription.
    pub async fn signature_subscribe(&self, id: &TxId) -> Result<SignatureSubscription, RpcError> {
        let url = self.ws_url.as_str();
        let mut socket = with_rpc_timeout(self.connect_timeout, "connect", async {
            connect_async(url)
                .await
                .map(|(socket, _response)| socket)
                .map_err(|e| RpcError::transport(format!("WebSocket connect to {url} failed: {e}")))
        })
        .await?;

        let request = json!({
            "jsonrpc": "2.0",
            "id": SUBSCRIBE_REQUEST_ID,
            "method": "signatureSubscribe",
            "params": [id.as_str(), { "commitment": self.commitment.as_str() }],
        });
        socket
            .send(Message::Text(request.to_string().into()))
            .await
            .map_err(|e| RpcError::transport(format!("signatureSubscribe send failed: {e}")))?;

        let subscription_id = with_rpc_timeout(
            self.connect_timeout,
            "signatureSubscribe",
            await_subscription_id(&mut socket),
        )
        .await?;

        tracing::debug!(tx_id = %id, subscription_id, "Signature subscription opened");
        Ok(SignatureSubscription {
            socket: Some(socket),
            subscription_id,
            id: id.clone(),
            release_timeout: self.connect_timeout,
        })
    }
}

async fn await_subscription_id(socket: &mut WsStream) -> Result<u64, RpcError> {
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => {
                let reply: Value = match serde_json::from_str(text.as_str()) {
                    Ok(reply) => reply,
                    Err(e) => {
                        tracing::debug!(error = %e, "Ignoring non-JSON frame");
                        continue;
                    }
                };
                if reply.get("id").and_then(Value::as_u64) != Some(SUBSCRIBE_REQUEST_ID) {
                    continue;
                }
                if let Some(error) = reply.get("error") {
                    return Err(RpcError::rejected(format!("signatureSubscribe failed: {error}")));
                }
                return reply
                    .get("result")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| RpcError::transport("signatureSubscribe: missing subscription id"));
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(RpcError::transport("WebSocket closed before subscription was acknowledged"));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(RpcError::transport(format!("WebSocket error: {e}"))),
        }
    }
}

/// A live `signatureSubscribe`. Yields at most one event.
pub struct SignatureSubscription {
    socket: Option<WsStream>,
    subscription_id: u64,
    id: TxId,
    release_timeout: Duration,
}

impl SignatureSubscription {
    pub fn subscription_id(&self) -> u64 {
        self.subscription_id
    }

    /// Turn a notification frame into an event, if it is ours and final.
    fn parse_notification(&self, frame: &Value) -> Option<ConfirmationEvent> {
        if frame.get("method").and_then(Value::as_str) != Some("signatureNotification") {
            return None;
        }
        let params = frame.get("params")?;
        if params.get("subscription").and_then(Value::as_u64) != Some(self.subscription_id) {
            return None;
        }

        let result = params.get("result")?;
        let value = result.get("value")?;
        // "receivedSignature" notifications carry a string value.
        if !value.is_object() {
            return None;
        }

        let outcome = match value.get("err") {
            None | Some(Value::Null) => ConfirmationOutcome::Success,
            Some(err) => ConfirmationOutcome::Failed(err.to_string()),
        };
        Some(ConfirmationEvent {
            id: self.id.clone(),
            slot: result
                .get("context")
                .and_then(|context| context.get("slot"))
                .and_then(Value::as_u64),
            outcome,
        })
    }
}

#[async_trait]
impl ConfirmationSubscription for SignatureSubscription {
    async fn next_event(&mut self) -> Option<ConfirmationEvent> {
        loop {
            let frame = self.socket.as_mut()?.next().await;
            match frame {
                Some(Ok(Message::Text(text))) => {
                    let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    if let Some(event) = self.parse_notification(&frame) {
                        return Some(event);
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(tx_id = %self.id, "Signature subscription closed by node");
                    self.socket = None;
                    return None;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(tx_id = %self.id, error = %e, "Signature subscription failed");
                    self.socket = None;
                    return None;
                }
            }
        }
    }

    async fn unsubscribe(&mut self) {
        let Some(mut socket) = self.socket.take() else {
            return;
        };

        let request = json!({
            "jsonrpc": "2.0",
            "id": UNSUBSCRIBE_REQUEST_ID,
            "method": "signatureUnsubscribe",
            "params": [self.subscription_id],
        });
        let id = &self.id;
        let release = async {
            if let Err(e) = socket.send(Message::Text(request.to_string().into())).await {
                tracing::debug!(tx_id = %id, error = %e, "signatureUnsubscribe send failed");
            }
            socket
                .close(None)
                .await
                .map_err(|e| RpcError::transport(format!("WebSocket close failed: {e}")))
        };

        // The socket is dropped either way, which tears the connection down.
        match with_rpc_timeout(self.release_timeout, "signatureUnsubscribe", release).await {
            Ok(()) => {
                tracing::debug!(tx_id = %self.id, subscription_id = self.subscription_id, "Signature subscription released");
            }
            Err(e) => tracing::warn!(
                tx_id = %self.id,
                subscription_id = self.subscription_id,
                error = %e,
                "Signature subscription release did not complete cleanly"
            ),
        }
    }
}

impl std::fmt::Debug for SignatureSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureSubscription")
            .field("id", &self.id)
            .field("subscription_id", &self.subscription_id)
            .field("open", &self.socket.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription() -> SignatureSubscription {
        SignatureSubscription {
            socket: None,
            subscription_id: 42,
            id: TxId::new("5sig"),
            release_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_parse_success_notification() {
        let frame = json!({
            "jsonrpc": "2.0",
            "method": "signatureNotification",
            "params": {
                "result": { "context": { "slot": 5207624 }, "value": { "err": null } },
                "subscription": 42
            }
        });
        let event = subscription().parse_notification(&frame).unwrap();
        assert_eq!(event.slot, Some(5207624));
        assert_eq!(event.outcome, ConfirmationOutcome::Success);
        assert_eq!(event.id.as_str(), "5sig");
    }

    #[test]
    fn test_parse_failed_notification() {
        let frame = json!({
            "method": "signatureNotification",
            "params": {
                "result": {
                    "context": { "slot": 7 },
                    "value": { "err": { "InstructionError": [0, { "Custom": 1 }] } }
                },
                "subscription": 42
            }
        });
        let event = subscription().parse_notification(&frame).unwrap();
        assert!(matches!(event.outcome, ConfirmationOutcome::Failed(ref reason) if reason.contains("Custom")));
    }

    #[test]
    fn test_ignores_foreign_and_received_notifications() {
        let other = json!({
            "method": "signatureNotification",
            "params": { "result": { "value": { "err": null } }, "subscription": 7 }
        });
        assert!(subscription().parse_notification(&other).is_none());

        let received = json!({
            "method": "signatureNotification",
            "params": { "result": { "value": "receivedSignature" }, "subscription": 42 }
        });
        assert!(subscription().parse_notification(&received).is_none());

        let ack = json!({ "jsonrpc": "2.0", "id": 1, "result": 42 });
        assert!(subscription().parse_notification(&ack).is_none());
    }

    #[tokio::test]
    async fn test_closed_subscription_yields_nothing() {
        let mut sub = subscription();
        assert!(sub.next_event().await.is_none());
        sub.unsubscribe().await;
    }

    #[tokio::test]
    async fn test_release_is_bounded_when_peer_stops_reading() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (hold_tx, hold_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let socket = tokio_tungstenite::accept_async(stream).await.unwrap();
            // Keep the connection open without reading from it.
            let _ = hold_rx.await;
            drop(socket);
        });

        let (mut socket, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        let mut stalled = false;
        for _ in 0..4_096 {
            let chunk = Message::Binary(vec![0u8; 64 * 1024].into());
            if tokio::time::timeout(Duration::from_millis(200), socket.send(chunk)).await.is_err() {
                stalled = true;
                break;
            }
        }
        assert!(stalled, "socket buffers never filled");

        let mut sub = SignatureSubscription {
            socket: Some(socket),
            subscription_id: 42,
            id: TxId::new("5sig"),
            release_timeout: Duration::from_millis(300),
        };
        let released = tokio::time::timeout(Duration::from_secs(5), sub.unsubscribe()).await;
        assert!(released.is_ok());
        assert!(sub.socket.is_none());
        let _ = hold_tx.send(());
    }
}
