//! End-to-end tests against a real WebSocket server on a random port.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use wirechat::prelude::*;

type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

async fn listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
    let addr = listener.local_addr().expect("should have addr");
    (listener, format!("ws://{addr}/ws"))
}

async fn accept(listener: &TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.expect("should accept");
    tokio_tungstenite::accept_async(stream)
        .await
        .expect("server handshake")
}

/// Next JSON frame from the client. `None` once the client closes.
async fn next_json(ws: &mut ServerWs) -> Option<Value> {
    loop {
        match ws.next().await? {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(&text).unwrap()),
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(other) => panic!("unexpected frame {other:?}"),
        }
    }
}

async fn send_json(ws: &mut ServerWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("server send");
}

async fn wait_for(client: &Client, state: ConnectionState) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while client.state() != state {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("state stuck at {}", client.state()));
}

#[tokio::test]
async fn test_round_trip_over_websocket() {
    let (listener, url) = listener().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;

        let hello = next_json(&mut ws).await.unwrap();
        assert_eq!(hello, json!({"type": "hello", "data": {"protocol": 1, "user": "alice"}}));

        let join = next_json(&mut ws).await.unwrap();
        assert_eq!(join, json!({"type": "join", "data": {"room": "general"}}));

        send_json(
            &mut ws,
            json!({"type": "event", "event": "history", "data": {"room": "general", "messages": []}}),
        )
        .await;

        let msg = next_json(&mut ws).await.unwrap();
        assert_eq!(msg["data"]["text"], "hello world");
        send_json(
            &mut ws,
            json!({"type": "event", "event": "message", "data": {
                "id": 1, "room": "general", "user": "alice", "text": "hello world", "ts": 1700000000
            }}),
        )
        .await;

        // Client closes next.
        assert!(next_json(&mut ws).await.is_none());
    });

    let client = Client::new(ClientConfig::new(&url).with_user("alice"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let history_tx = tx.clone();
    client.on_history(move |h| {
        let _ = history_tx.send(format!("history:{}", h.room));
    });
    client.on_message(move |m| {
        let _ = tx.send(format!("{}:{}", m.user, m.text));
    });

    client.connect().await.expect("should connect");
    client.join("general").await.unwrap();
    client.send("general", "hello world").await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert_eq!(first.as_deref(), Some("history:general"));
    assert_eq!(second.as_deref(), Some("alice:hello world"));

    client.close().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Closed);
    server.await.expect("server task");
}

#[tokio::test]
async fn test_reconnects_and_rejoins_after_server_restart() {
    let (listener, url) = listener().await;
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<()>();
    let server = tokio::spawn(async move {
        let mut first = accept(&listener).await;
        assert_eq!(next_json(&mut first).await.unwrap()["type"], "hello");
        assert_eq!(next_json(&mut first).await.unwrap()["type"], "join");
        first
            .close(Some(CloseFrame {
                code: CloseCode::Error,
                reason: "restarting".into(),
            }))
            .await
            .unwrap();
        drop(first);

        let mut second = accept(&listener).await;
        assert_eq!(next_json(&mut second).await.unwrap()["type"], "hello");
        let rejoin = next_json(&mut second).await.unwrap();
        assert_eq!(rejoin, json!({"type": "join", "data": {"room": "general"}}));
        let _ = done_tx.send(());
        while next_json(&mut second).await.is_some() {}
    });

    let config = ClientConfig::new(&url)
        .with_auto_reconnect(true)
        .with_backoff(BackoffConfig {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
            max_attempts: 10,
            jitter: Duration::ZERO,
        });
    let client = Client::new(config);
    let (err_tx, mut err_rx) = mpsc::unbounded_channel();
    client.on_error(move |e| {
        let _ = err_tx.send(e);
    });

    client.connect().await.unwrap();
    client.join("general").await.unwrap();

    let err = tokio::time::timeout(Duration::from_secs(5), err_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(err.is_connection(), "got {err}");

    tokio::time::timeout(Duration::from_secs(5), done_rx.recv())
        .await
        .expect("server should see the rejoin");
    wait_for(&client, ConnectionState::Connected).await;
    assert_eq!(client.joined_rooms(), vec!["general".to_string()]);

    client.close().await.unwrap();
    server.await.expect("server task");
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    let (listener, url) = listener().await;
    drop(listener);

    let client = Client::new(ClientConfig::new(&url));
    let err = client.connect().await.unwrap_err();

    assert!(err.is_connection());
    assert_eq!(client.state(), ConnectionState::Error);
}
