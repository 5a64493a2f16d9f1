use std::sync::Arc;
use std::time::Duration;

use geoguard::{
    EventSource, GuardError, HttpWalletProvider, JsonRpcClient, SessionManager, WalletProvider,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ALICE: &str = "0x1000000000000000000000000000000000000001";

fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": result
    }))
}

async fn mount(server: &MockServer, name: &str, result: Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": name })))
        .respond_with(rpc_result(result))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_rpc_client_maps_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_chainId" })))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_foo" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32601, "message": "Method not found" }
        })))
        .mount(&server)
        .await;

    let client = JsonRpcClient::new(&server.uri());

    let err = client.request_raw("eth_chainId", json!([])).await.unwrap_err();
    assert!(matches!(err, GuardError::Http { status: 502, .. }));

    let err = client.request_raw("eth_foo", json!([])).await.unwrap_err();
    assert!(matches!(err, GuardError::Rpc { code: -32601, .. }));
    assert_eq!(err.to_string(), "Method not found");
}

#[tokio::test]
async fn test_detect() {
    let server = MockServer::start().await;
    mount(&server, "eth_chainId", json!("0xa869")).await;

    let provider = HttpWalletProvider::new(&server.uri(), EventSource::Disabled);
    assert!(provider.detect().await);

    // Nothing listens on port 1.
    let missing = HttpWalletProvider::new("http://127.0.0.1:1", EventSource::Disabled);
    assert!(!missing.detect().await);
}

#[tokio::test]
async fn test_polled_chain_change_reaches_session() {
    let server = MockServer::start().await;
    mount(&server, "eth_accounts", json!([ALICE])).await;
    mount(&server, "eth_chainId", json!("0xa869")).await;

    let provider = Arc::new(HttpWalletProvider::new(
        &server.uri(),
        EventSource::Poll(Duration::from_millis(20)),
    ));
    provider.start();
    let manager = SessionManager::new(Arc::clone(&provider));

    let session = manager.init().await.unwrap();
    assert_eq!(session.chain_id, Some(43113));
    assert!(session.is_testnet);

    // Let the poller take its baseline, then switch the wallet to mainnet.
    tokio::time::sleep(Duration::from_millis(100)).await;
    server.reset().await;
    mount(&server, "eth_accounts", json!([ALICE])).await;
    mount(&server, "eth_chainId", json!("0xa86a")).await;

    let mut rx = manager.subscribe();
    let session = tokio::time::timeout(
        Duration::from_secs(2),
        rx.wait_for(|s| s.chain_id == Some(43114)),
    )
    .await
    .expect("chain change not observed")
    .unwrap()
    .clone();

    assert!(!session.is_testnet);
    assert_eq!(session.network_id, Some(1));

    provider.shutdown();
}

#[tokio::test]
async fn test_polled_account_removal_disconnects() {
    let server = MockServer::start().await;
    mount(&server, "eth_accounts", json!([ALICE])).await;
    mount(&server, "eth_chainId", json!("0xa86a")).await;

    let provider = Arc::new(HttpWalletProvider::new(
        &server.uri(),
        EventSource::Poll(Duration::from_millis(20)),
    ));
    provider.start();
    let manager = SessionManager::new(Arc::clone(&provider));
    assert!(manager.init().await.unwrap().connected);

    tokio::time::sleep(Duration::from_millis(100)).await;
    server.reset().await;
    mount(&server, "eth_accounts", json!([])).await;
    mount(&server, "eth_chainId", json!("0xa86a")).await;

    let mut rx = manager.subscribe();
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| !s.connected))
        .await
        .expect("disconnect not observed")
        .unwrap();

    provider.shutdown();
}

#[tokio::test]
async fn test_websocket_bridge_forwards_notifications() {
    use futures_util::{SinkExt, StreamExt};
    use geoguard::ws::ProviderEventStream;
    use geoguard::ProviderEvent;
    use tokio::sync::broadcast;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_util::sync::CancellationToken;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let frames = [
            r#"{"jsonrpc":"2.0","method":"chainChanged","params":"0xa869"}"#,
            r#"{"jsonrpc":"2.0","method":"eth_subscription","params":{}}"#,
            r#"{"jsonrpc":"2.0","method":"accountsChanged","params":[["0x1000000000000000000000000000000000000001"]]}"#,
        ];
        for frame in frames {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (tx, mut rx) = broadcast::channel::<ProviderEvent>(8);
    let cancel = CancellationToken::new();
    let handle = ProviderEventStream::new(format!("ws://{addr}"), tx).connect(cancel.clone());

    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, ProviderEvent::ChainChanged(json!("0xa869")));

    // Unrelated frames are skipped.
    let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second, ProviderEvent::AccountsChanged(vec![ALICE.to_string()]));

    cancel.cancel();
    handle.await.unwrap();
}
