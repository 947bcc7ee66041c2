// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use futures_util::{SinkExt, StreamExt};
use swarmload_core::{AgentIdentity, ConnectionType, Connector};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as ServerMessage;

#[test]
fn fanout_sender_forwards_to_subscribers() {
    let fanout = FanoutSender::new();
    let mut subscriber = fanout.subscribe();

    fanout.forward(ConsoleMessage::Stop);
    assert_eq!(subscriber.try_recv().expect("message"), ConsoleMessage::Stop);
}

#[test]
fn fanout_sender_shutdown_stops_forwarding() {
    let fanout = FanoutSender::new();
    let mut subscriber = fanout.subscribe();

    fanout.shutdown();
    fanout.forward(ConsoleMessage::Stop);
    assert!(subscriber.try_recv().is_err());
}

/// Bind a loopback listener and accept exactly one websocket connection,
/// handing the resulting server-side stream to `body`.
async fn with_console_server<F, Fut>(body: F) -> u16
where
    F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let port = listener.local_addr().expect("local addr").port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let ws = tokio_tungstenite::accept_async(stream).await.expect("websocket handshake");
        body(ws).await;
    });

    port
}

#[tokio::test]
async fn connect_sends_initial_started_report() {
    let port = with_console_server(|mut ws| async move {
        let frame = ws.next().await.expect("frame").expect("ok");
        let ServerMessage::Text(text) = frame else { panic!("expected text frame") };
        assert!(text.contains("STARTED"));
        // Keep the socket open for the remainder of the test.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    })
    .await;

    let connector = Connector::new("127.0.0.1", port, ConnectionType::Agent);
    let identity = AgentIdentity::new("test-host");
    let file_store_cell = tokio::sync::OnceCell::new();
    let dir = tempfile::tempdir().expect("tempdir");

    let comms = ConsoleCommunication::connect(
        connector,
        &identity,
        &file_store_cell,
        dir.path(),
        "test-host",
        ConsoleListener::new(),
        FanoutSender::new(),
    )
    .await
    .expect("connect");

    assert!(!comms.is_dead());
    comms.shutdown();
}

#[tokio::test]
async fn pump_marks_session_dead_once_server_closes() {
    let port = with_console_server(|mut ws| async move {
        let _ = ws.next().await;
        ws.close(None).await.expect("close");
    })
    .await;

    let connector = Connector::new("127.0.0.1", port, ConnectionType::Agent);
    let identity = AgentIdentity::new("test-host");
    let file_store_cell = tokio::sync::OnceCell::new();
    let dir = tempfile::tempdir().expect("tempdir");

    let comms = ConsoleCommunication::connect(
        connector,
        &identity,
        &file_store_cell,
        dir.path(),
        "test-host",
        ConsoleListener::new(),
        FanoutSender::new(),
    )
    .await
    .expect("connect");

    for _ in 0..50 {
        if comms.is_dead() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(comms.is_dead());
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let port = with_console_server(|mut ws| async move {
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;

    let connector = Connector::new("127.0.0.1", port, ConnectionType::Agent);
    let identity = AgentIdentity::new("test-host");
    let file_store_cell = tokio::sync::OnceCell::new();
    let dir = tempfile::tempdir().expect("tempdir");

    let comms = ConsoleCommunication::connect(
        connector,
        &identity,
        &file_store_cell,
        dir.path(),
        "test-host",
        ConsoleListener::new(),
        FanoutSender::new(),
    )
    .await
    .expect("connect");

    comms.shutdown();
    comms.shutdown();
}
