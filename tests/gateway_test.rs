// End-to-end tests for the WebSocket gateway: real sockets against an
// in-process server bound to an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::protocol::Message as TungsteniteMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use roomcast::auth::{issue_token, AuthVerifier, JwtVerifier};
use roomcast::config::ServerConfig;
use roomcast::core::service::FeedService;
use roomcast::handlers::{gateway_routes, GatewayState};
use roomcast::transport::{TransportSender, WsTransport};

const SECRET: &str = "test-jwt-secret-only-for-unit-tests-never-use-in-production";

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        default_room: "general".to_string(),
        history_limit: 10,
        history_capacity: 100,
        fanout_workers: 8,
        send_timeout: Duration::from_secs(1),
        broadcast_deadline: Duration::from_secs(5),
        jwt_secret: SECRET.to_string(),
    }
}

/// Spawn an in-process gateway on an ephemeral port, return its port
async fn start_gateway() -> u16 {
    let config = test_config();
    let transport = Arc::new(WsTransport::new());
    let service = Arc::new(FeedService::new(
        &config,
        Arc::clone(&transport) as Arc<dyn TransportSender>,
    ));
    let verifier: Arc<dyn AuthVerifier> = Arc::new(JwtVerifier::new(&config.jwt_secret));
    let state = GatewayState::new(&config, service, transport, verifier);

    let (addr, server) = warp::serve(gateway_routes(state)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr.port()
}

async fn connect(port: u16, name: &str) -> WsClient {
    let url = format!("ws://127.0.0.1:{}/ws?name={}", port, name);
    let (client, _response) = connect_async(url).await.expect("failed to connect");
    client
}

/// Read the next text frame as JSON, failing the test on timeout
async fn next_frame(client: &mut WsClient) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for frame")
        .expect("socket closed")
        .expect("socket error");
    match frame {
        TungsteniteMessage::Text(text) => serde_json::from_str(&text).expect("non-JSON frame"),
        other => panic!("expected text frame, got {:?}", other),
    }
}

async fn send_json(client: &mut WsClient, value: Value) {
    client
        .send(TungsteniteMessage::Text(value.to_string()))
        .await
        .expect("failed to send");
}

#[tokio::test]
async fn test_message_is_broadcast_to_every_connection() {
    let port = start_gateway().await;

    let mut alice = connect(port, "alice").await;
    let mut bob = connect(port, "bob").await;

    // Both clients first receive the (empty) history replay
    assert_eq!(next_frame(&mut alice).await["messages"], json!([]));
    assert_eq!(next_frame(&mut bob).await["messages"], json!([]));

    let token = issue_token(SECRET, "alice", Duration::from_secs(3600)).unwrap();
    send_json(
        &mut alice,
        json!({"action": "send_message", "token": token, "content": "hello room"}),
    )
    .await;

    // The sender receives its own message too
    for client in [&mut alice, &mut bob] {
        let frame = next_frame(client).await;
        assert_eq!(frame["messages"][0]["author"], "alice");
        assert_eq!(frame["messages"][0]["content"], "hello room");
        assert_eq!(frame["messages"][0]["sequence_index"], 0);
    }
}

#[tokio::test]
async fn test_history_is_replayed_to_a_late_joiner() {
    let port = start_gateway().await;

    let mut alice = connect(port, "alice").await;
    assert_eq!(next_frame(&mut alice).await["messages"], json!([]));

    let token = issue_token(SECRET, "alice", Duration::from_secs(3600)).unwrap();
    for content in ["one", "two"] {
        send_json(
            &mut alice,
            json!({"action": "send_message", "token": token, "content": content}),
        )
        .await;
        next_frame(&mut alice).await;
    }

    let mut bob = connect(port, "bob").await;
    let replay = next_frame(&mut bob).await;
    let contents: Vec<&str> = replay["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["one", "two"]);
}

#[tokio::test]
async fn test_unrecognized_action_is_reported_back() {
    let port = start_gateway().await;

    let mut client = connect(port, "alice").await;
    next_frame(&mut client).await;

    send_json(&mut client, json!({"action": "dance"})).await;
    let frame = next_frame(&mut client).await;
    assert!(frame["error"]
        .as_str()
        .unwrap()
        .contains("Unrecognized request"));
}

#[tokio::test]
async fn test_invalid_token_is_rejected_without_a_broadcast() {
    let port = start_gateway().await;

    let mut client = connect(port, "alice").await;
    next_frame(&mut client).await;

    send_json(
        &mut client,
        json!({"action": "send_message", "token": "garbage", "content": "hi"}),
    )
    .await;
    let frame = next_frame(&mut client).await;
    assert_eq!(frame["error"], "Token verification failed.");

    // Nothing was appended
    send_json(&mut client, json!({"action": "recent_messages"})).await;
    assert_eq!(next_frame(&mut client).await["messages"], json!([]));
}

#[tokio::test]
async fn test_empty_content_is_rejected_and_consumes_no_index() {
    let port = start_gateway().await;

    let mut client = connect(port, "alice").await;
    next_frame(&mut client).await;

    let token = issue_token(SECRET, "alice", Duration::from_secs(3600)).unwrap();
    send_json(
        &mut client,
        json!({"action": "send_message", "token": token, "content": ""}),
    )
    .await;
    let frame = next_frame(&mut client).await;
    assert!(frame["error"].as_str().unwrap().contains("must not be empty"));

    send_json(
        &mut client,
        json!({"action": "send_message", "token": token, "content": "real one"}),
    )
    .await;
    let frame = next_frame(&mut client).await;
    assert_eq!(frame["messages"][0]["sequence_index"], 0);
}
