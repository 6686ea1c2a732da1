//! Shared utilities for integration testing.

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

use dapp_client::blockchain::{
    ConfirmationEvent, ConfirmationOutcome, ConfirmationSource, ConfirmationSubscription, RpcError,
    SignedTransaction, TransactionSubmitter, TxId, ValidityWindow,
};

pub fn signed_tx(last_valid: u64) -> SignedTransaction {
    SignedTransaction::new(
        "mock",
        TxId::new("sig-1"),
        vec![1, 2, 3, 4],
        ValidityWindow::BlockHeight(last_valid),
    )
}

/// What a mock subscription does once polled.
#[derive(Debug, Clone)]
pub enum StreamBehavior {
    /// Emit this outcome after the delay.
    Emit(Duration, ConfirmationOutcome),
    /// End the stream without an event.
    Close,
    /// Never emit.
    Silent,
}

/// Scripted adapter that counts every call.
pub struct MockAdapter {
    script: Mutex<VecDeque<Result<TxId, RpcError>>>,
    fallback: Result<TxId, RpcError>,
    pub submits: AtomicU32,
    pub expiry_checks: AtomicU32,
    pub expired: AtomicBool,
    pub submitted_bytes: Mutex<Vec<Vec<u8>>>,
    behavior: StreamBehavior,
    pub subscribes: AtomicU32,
    pub releases: Arc<AtomicU32>,
}

impl MockAdapter {
    /// Every submission returns `outcome`.
    pub fn always(outcome: Result<TxId, RpcError>) -> Self {
        Self::scripted(Vec::new(), outcome)
    }

    /// Submissions return `script` in order, then `fallback`.
    pub fn scripted(script: Vec<Result<TxId, RpcError>>, fallback: Result<TxId, RpcError>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            submits: AtomicU32::new(0),
            expiry_checks: AtomicU32::new(0),
            expired: AtomicBool::new(false),
            submitted_bytes: Mutex::new(Vec::new()),
            behavior: StreamBehavior::Silent,
            subscribes: AtomicU32::new(0),
            releases: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn with_stream(mut self, behavior: StreamBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn submit_count(&self) -> u32 {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> u32 {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSubmitter for MockAdapter {
    async fn submit(&self, tx: &SignedTransaction) -> Result<TxId, RpcError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.submitted_bytes.lock().unwrap().push(tx.raw().to_vec());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    async fn reference_expired(&self, _window: &ValidityWindow) -> Result<bool, RpcError> {
        self.expiry_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.expired.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl ConfirmationSource for MockAdapter {
    async fn subscribe(&self, id: &TxId) -> Result<Box<dyn ConfirmationSubscription>, RpcError> {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSubscription {
            id: id.clone(),
            behavior: self.behavior.clone(),
            releases: self.releases.clone(),
            released: false,
        }))
    }
}

/// Counts a release once, whether through `unsubscribe` or drop.
pub struct MockSubscription {
    id: TxId,
    behavior: StreamBehavior,
    releases: Arc<AtomicU32>,
    released: bool,
}

impl MockSubscription {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl ConfirmationSubscription for MockSubscription {
    async fn next_event(&mut self) -> Option<ConfirmationEvent> {
        match self.behavior.clone() {
            StreamBehavior::Emit(delay, outcome) => {
                tokio::time::sleep(delay).await;
                Some(ConfirmationEvent {
                    id: self.id.clone(),
                    slot: Some(42),
                    outcome,
                })
            }
            StreamBehavior::Close => None,
            StreamBehavior::Silent => std::future::pending().await,
        }
    }

    async fn unsubscribe(&mut self) {
        self.release();
    }
}

impl Drop for MockSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Start a mock JSON-RPC backend on an ephemeral port.
///
/// `handler(method, params)` returns the `result` value, or `Err(error)` for
/// the `error` member. Every request is recorded as `(method, params)`.
pub async fn start_rpc_backend<F, Fut>(handler: F) -> (SocketAddr, Arc<Mutex<Vec<(String, Value)>>>)
where
    F: Fn(String, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, Value>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_json_body(&mut socket).await else {
                            return;
                        };
                        let method = request["method"].as_str().unwrap_or_default().to_string();
                        let params = request["params"].clone();
                        recorded.lock().unwrap().push((method.clone(), params.clone()));

                        let body = match handler(method, params).await {
                            Ok(result) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
                            Err(error) => json!({ "jsonrpc": "2.0", "id": request["id"], "error": error }),
                        }
                        .to_string();

                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, requests)
}

async fn read_json_body(socket: &mut TcpStream) -> Option<Value> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let length: usize = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0);

        let body_start = header_end + 4;
        if buf.len() >= body_start + length {
            return serde_json::from_slice(&buf[body_start..body_start + length]).ok();
        }
    }
}

/// How the mock WebSocket node answers a `signatureSubscribe`.
#[derive(Debug, Clone)]
pub enum PubsubBehavior {
    /// Acknowledge, then send a notification with this `err` value.
    Notify(Value),
    /// Acknowledge, then close the socket.
    Close,
    /// Acknowledge, then stay quiet.
    Silent,
    /// Reply with a JSON-RPC error instead of a subscription id.
    Reject,
}

/// Frames seen by the mock WebSocket node.
#[derive(Debug, Default)]
pub struct PubsubLog {
    pub subscribes: AtomicU32,
    pub unsubscribes: AtomicU32,
    pub disconnects: AtomicU32,
}

pub const SUBSCRIPTION_ID: u64 = 4242;

/// Start a mock Solana pubsub node on an ephemeral port.
pub async fn start_pubsub_backend(behavior: PubsubBehavior) -> (SocketAddr, Arc<PubsubLog>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(PubsubLog::default());
    let shared = log.clone();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let behavior = behavior.clone();
            let log = shared.clone();
            tokio::spawn(async move {
                let Ok(mut socket) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(frame)) = socket.next().await {
                    let text = match frame {
                        Message::Text(text) => text,
                        Message::Close(_) => break,
                        _ => continue,
                    };
                    let request: Value = serde_json::from_str(text.as_str()).unwrap_or_default();
                    match request["method"].as_str() {
                        Some("signatureSubscribe") => {
                            log.subscribes.fetch_add(1, Ordering::SeqCst);
                            let reply = match behavior {
                                PubsubBehavior::Reject => json!({
                                    "jsonrpc": "2.0",
                                    "id": request["id"],
                                    "error": { "code": -32602, "message": "Invalid signature" }
                                }),
                                _ => json!({ "jsonrpc": "2.0", "id": request["id"], "result": SUBSCRIPTION_ID }),
                            };
                            let _ = socket.send(Message::Text(reply.to_string().into())).await;

                            match &behavior {
                                PubsubBehavior::Notify(err) => {
                                    let unrelated = json!({
                                        "jsonrpc": "2.0",
                                        "method": "signatureNotification",
                                        "params": { "result": { "context": { "slot": 1 }, "value": { "err": null } }, "subscription": 1 }
                                    });
                                    let _ = socket.send(Message::Text(unrelated.to_string().into())).await;
                                    let notification = json!({
                                        "jsonrpc": "2.0",
                                        "method": "signatureNotification",
                                        "params": {
                                            "result": { "context": { "slot": 5207624 }, "value": { "err": err } },
                                            "subscription": SUBSCRIPTION_ID
                                        }
                                    });
                                    let _ = socket.send(Message::Text(notification.to_string().into())).await;
                                }
                                PubsubBehavior::Close => {
                                    let _ = socket.close(None).await;
                                }
                                PubsubBehavior::Silent | PubsubBehavior::Reject => {}
                            }
                        }
                        Some("signatureUnsubscribe") => {
                            log.unsubscribes.fetch_add(1, Ordering::SeqCst);
                            let reply = json!({ "jsonrpc": "2.0", "id": request["id"], "result": true });
                            let _ = socket.send(Message::Text(reply.to_string().into())).await;
                        }
                        _ => {}
                    }
                }
                log.disconnects.fetch_add(1, Ordering::SeqCst);
            });
        }
    });

    (addr, log)
}

/// Poll `condition` until it holds or `limit` elapses.
pub async fn wait_until(limit: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
