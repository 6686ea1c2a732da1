//! Solana JSON-RPC client and adapter against a mock node.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dapp_client::blockchain::solana::{
    build_transfer, Blockhash, Keypair, Pubkey, RecentBlockhash, SolanaNode, SolanaPubsub, SolanaRpcClient,
};
use dapp_client::blockchain::{
    BlockchainError, RpcErrorKind, SignedTransaction, SubmissionWatcher, TransactionSubmitter, ValidityWindow,
};
use dapp_client::config::Commitment;
use dapp_client::resilience::RetryPolicy;

mod common;

const LAST_VALID: u64 = 1_000;

fn client(addr: std::net::SocketAddr) -> SolanaRpcClient {
    SolanaRpcClient::with_endpoint(&format!("http://{addr}"), Commitment::Confirmed, Duration::from_secs(2)).unwrap()
}

fn signed_transfer() -> SignedTransaction {
    let keypair = Keypair::from_seed(&[1u8; 32]);
    let transfer = build_transfer(
        &keypair.pubkey().to_string(),
        &Pubkey::new_from_array([2u8; 32]).to_string(),
        "1000000",
        RecentBlockhash {
            hash: Blockhash::new_from_array([7u8; 32]),
            last_valid_block_height: LAST_VALID,
        },
    )
    .unwrap();
    keypair.sign_transfer(&transfer).unwrap()
}

fn preflight_error(err: Value) -> Value {
    json!({
        "code": -32002,
        "message": "Transaction simulation failed",
        "data": { "err": err, "logs": [] }
    })
}

fn node(rpc_addr: std::net::SocketAddr) -> SolanaNode {
    SolanaNode::from_parts(
        client(rpc_addr),
        // Not dialled by submission tests.
        SolanaPubsub::with_endpoint("ws://127.0.0.1:9", Commitment::Confirmed, Duration::from_secs(1)),
    )
}

#[tokio::test]
async fn test_latest_blockhash_and_balance() {
    let hash = Blockhash::new_from_array([7u8; 32]).to_string();
    let expected = hash.clone();
    let (addr, requests) = common::start_rpc_backend(move |method, _params| {
        let hash = hash.clone();
        async move {
            match method.as_str() {
                "getLatestBlockhash" => Ok(json!({
                    "context": { "slot": 2792 },
                    "value": { "blockhash": hash, "lastValidBlockHeight": 3090 }
                })),
                "getBalance" => Ok(json!({ "context": { "slot": 1 }, "value": 2_500_000_000u64 })),
                "getBlockHeight" => Ok(json!(2900)),
                _ => Err(json!({ "code": -32601, "message": "Method not found" })),
            }
        }
    })
    .await;
    let rpc = client(addr);

    let recent = rpc.get_latest_blockhash().await.unwrap();
    assert_eq!(recent.hash.to_string(), expected);
    assert_eq!(recent.last_valid_block_height, 3090);

    let balance = rpc.get_balance(&Pubkey::new_from_array([2u8; 32])).await.unwrap();
    assert_eq!(balance, 2_500_000_000);
    assert_eq!(rpc.get_block_height().await.unwrap(), 2900);

    let requests = requests.lock().unwrap();
    assert_eq!(requests[0].0, "getLatestBlockhash");
    assert_eq!(requests[0].1, json!([{ "commitment": "confirmed" }]));
    assert_eq!(requests[1].1[0], json!(Pubkey::new_from_array([2u8; 32]).to_string()));
}

#[tokio::test]
async fn test_send_transaction_encodes_base64() {
    let tx = signed_transfer();
    let signature = tx.id().as_str().to_string();
    let (addr, requests) = common::start_rpc_backend(move |_method, _params| {
        let signature = signature.clone();
        async move { Ok(json!(signature)) }
    })
    .await;

    let id = client(addr).send_transaction(tx.raw()).await.unwrap();
    assert_eq!(&id, tx.id());

    let requests = requests.lock().unwrap();
    let (method, params) = &requests[0];
    assert_eq!(method, "sendTransaction");
    assert_eq!(BASE64.decode(params[0].as_str().unwrap()).unwrap(), tx.raw());
    assert_eq!(params[1]["encoding"], "base64");
    assert_eq!(params[1]["preflightCommitment"], "confirmed");
}

#[tokio::test]
async fn test_error_classification_from_node() {
    let cases = [
        (preflight_error(json!("BlockhashNotFound")), RpcErrorKind::ReferenceNotFound),
        (preflight_error(json!("InsufficientFundsForFee")), RpcErrorKind::InsufficientFunds),
        (
            json!({ "code": -32003, "message": "Transaction signature verification failure" }),
            RpcErrorKind::InvalidSignature,
        ),
        (preflight_error(json!({ "InstructionError": [0, "InvalidAccountData"] })), RpcErrorKind::Rejected),
    ];

    for (error, kind) in cases {
        let (addr, _) = common::start_rpc_backend(move |_method, _params| {
            let error = error.clone();
            async move { Err(error) }
        })
        .await;

        let err = client(addr).send_transaction(&[0u8; 4]).await.unwrap_err();
        assert_eq!(err.kind, kind);
    }
}

#[tokio::test]
async fn test_slow_node_is_a_transport_error() {
    let (addr, _) = common::start_rpc_backend(|_method, _params| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(json!(1))
    })
    .await;
    let rpc = SolanaRpcClient::with_endpoint(
        &format!("http://{addr}"),
        Commitment::Confirmed,
        Duration::from_millis(200),
    )
    .unwrap();

    let err = rpc.get_block_height().await.unwrap_err();
    assert_eq!(err.kind, RpcErrorKind::Transport);
    assert!(err.message.contains("getBlockHeight timed out"));
}

#[tokio::test]
async fn test_signature_status_lookup() {
    let (addr, _) = common::start_rpc_backend(|_method, params| async move {
        if params[0][0] == "known" {
            Ok(json!({
                "context": { "slot": 82 },
                "value": [{ "slot": 72, "confirmations": 10, "err": null, "confirmationStatus": "confirmed" }]
            }))
        } else {
            Ok(json!({ "context": { "slot": 82 }, "value": [null] }))
        }
    })
    .await;
    let rpc = client(addr);

    let status = rpc
        .get_signature_status(&dapp_client::blockchain::TxId::new("known"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status.slot, 72);
    assert!(status.err.is_none());
    assert_eq!(status.confirmation_status.as_deref(), Some("confirmed"));

    let missing = rpc
        .get_signature_status(&dapp_client::blockchain::TxId::new("unknown"))
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_watcher_retries_blockhash_not_found() {
    let sends = Arc::new(AtomicU32::new(0));
    let counter = sends.clone();
    let tx = signed_transfer();
    let signature = tx.id().as_str().to_string();

    let (addr, _) = common::start_rpc_backend(move |method, _params| {
        let counter = counter.clone();
        let signature = signature.clone();
        async move {
            match method.as_str() {
                "sendTransaction" => {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(preflight_error(json!("BlockhashNotFound")))
                    } else {
                        Ok(json!(signature))
                    }
                }
                "getBlockHeight" => Ok(json!(LAST_VALID - 10)),
                _ => Err(json!({ "code": -32601, "message": "Method not found" })),
            }
        }
    })
    .await;

    let watcher = SubmissionWatcher::new(
        Arc::new(node(addr)),
        RetryPolicy::fixed(3, Duration::from_millis(10)),
        "solana",
    );
    let id = watcher.submit_with_retry(&tx).await.unwrap();

    assert_eq!(&id, tx.id());
    assert_eq!(sends.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_watcher_stops_when_blockhash_expired() {
    let sends = Arc::new(AtomicU32::new(0));
    let counter = sends.clone();
    let (addr, _) = common::start_rpc_backend(move |method, _params| {
        let counter = counter.clone();
        async move {
            match method.as_str() {
                "sendTransaction" => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(preflight_error(json!("BlockhashNotFound")))
                }
                "getBlockHeight" => Ok(json!(LAST_VALID + 1)),
                _ => Err(json!({ "code": -32601, "message": "Method not found" })),
            }
        }
    })
    .await;

    let watcher = SubmissionWatcher::new(
        Arc::new(node(addr)),
        RetryPolicy::fixed(5, Duration::from_millis(10)),
        "solana",
    );
    let err = watcher.submit_with_retry(&signed_transfer()).await.unwrap_err();

    assert!(matches!(err, BlockchainError::ReferenceExpired { attempts: 1, .. }));
    assert_eq!(sends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_watcher_rejects_insufficient_funds_once() {
    let sends = Arc::new(AtomicU32::new(0));
    let counter = sends.clone();
    let (addr, _) = common::start_rpc_backend(move |_method, _params| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(preflight_error(json!({ "InsufficientFundsForRent": { "account_index": 0 } })))
        }
    })
    .await;

    let watcher = SubmissionWatcher::new(
        Arc::new(node(addr)),
        RetryPolicy::fixed(3, Duration::from_millis(10)),
        "solana",
    );
    let err = watcher.submit_with_retry(&signed_transfer()).await.unwrap_err();

    match err {
        BlockchainError::SubmissionRejected { attempts, source } => {
            assert_eq!(attempts, 1);
            assert_eq!(source.kind, RpcErrorKind::InsufficientFunds);
        }
        other => panic!("expected SubmissionRejected, got {other:?}"),
    }
    assert_eq!(sends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reference_expired_by_block_height() {
    let (addr, _) = common::start_rpc_backend(|_method, _params| async { Ok(json!(LAST_VALID)) }).await;
    let node = node(addr);

    assert!(!node.reference_expired(&ValidityWindow::BlockHeight(LAST_VALID)).await.unwrap());
    assert!(node.reference_expired(&ValidityWindow::BlockHeight(LAST_VALID - 1)).await.unwrap());
}
