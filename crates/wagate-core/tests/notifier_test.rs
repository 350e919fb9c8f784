#![allow(clippy::unwrap_used)]
// RealtimeNotifier against an in-process Socket.IO stand-in.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use wagate_core::{ConnectionUpdate, GatewayConfig, QrUpdate, RealtimeNotifier, ReconnectConfig};

const OPEN: &str =
    r#"0{"sid":"eio-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
const WAIT: Duration = Duration::from_secs(5);

async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => return text.as_str().to_owned(),
            Message::Close(_) => panic!("client closed early"),
            _ => {}
        }
    }
}

/// Accept a client and acknowledge its namespace connect.
async fn accept_handshake(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    ws.send(Message::text(OPEN)).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "40");
    ws.send(Message::text(r#"40{"sid":"sock-1"}"#)).await.unwrap();
    ws
}

fn config_with_backoff(addr: std::net::SocketAddr, initial: Duration) -> GatewayConfig {
    let mut config = GatewayConfig::from_url(&format!("http://{addr}/api")).unwrap();
    config.reconnect = ReconnectConfig {
        initial_delay: initial,
        max_delay: Duration::from_secs(5),
        max_retries: None,
    };
    config
}

/// Accept one client, complete the handshake, check the room join, then
/// push one QR and one connection event.
async fn serve_once(listener: TcpListener) -> Vec<String> {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    let mut seen = Vec::new();

    ws.send(Message::text(OPEN)).await.unwrap();
    seen.push(next_text(&mut ws).await);
    ws.send(Message::text(r#"40{"sid":"sock-1"}"#)).await.unwrap();
    seen.push(next_text(&mut ws).await);

    ws.send(Message::text(r#"42["qr",{"sessionName":"sales","qr":"2@pair"}]"#))
        .await
        .unwrap();
    ws.send(Message::text(
        r#"42["connection",{"sessionName":"sales","status":"connected","phoneNumber":"62811"}]"#,
    ))
    .await
    .unwrap();

    // Drain until the client says goodbye.
    while let Some(Ok(msg)) = ws.next().await {
        match msg {
            Message::Text(text) => seen.push(text.as_str().to_owned()),
            Message::Close(_) => break,
            _ => {}
        }
    }
    seen
}

#[tokio::test]
async fn test_join_and_receive_events() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_once(listener));

    let config = GatewayConfig::from_url(&format!("http://{addr}/api")).unwrap();
    let notifier = RealtimeNotifier::from_config(&config).unwrap();

    let (qr_tx, mut qr_rx) = mpsc::unbounded_channel::<QrUpdate>();
    let (conn_tx, mut conn_rx) = mpsc::unbounded_channel::<ConnectionUpdate>();
    let _qr_sub = notifier.on_qr(move |update| {
        let _ = qr_tx.send(update.clone());
    });
    let _conn_sub = notifier.on_connection(move |update| {
        let _ = conn_tx.send(update.clone());
    });

    notifier.connect();
    notifier.connect();
    notifier.join_session("sales").unwrap();

    let qr = timeout(WAIT, qr_rx.recv()).await.unwrap().unwrap();
    assert_eq!(qr.session_name, "sales");
    assert_eq!(qr.qr, "2@pair");

    let conn = timeout(WAIT, conn_rx.recv()).await.unwrap().unwrap();
    assert_eq!(conn.status, "connected");
    assert_eq!(conn.phone_number.as_deref(), Some("62811"));
    assert!(notifier.is_connected());

    notifier.leave_session("sales").unwrap();
    // Give the leave frame a moment to reach the socket before closing.
    tokio::time::sleep(Duration::from_millis(100)).await;
    notifier.disconnect();

    let seen = timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(seen[0], "40");
    assert_eq!(seen[1], r#"42["join-session","sales"]"#);
    assert!(seen.contains(&r#"42["leave-session","sales"]"#.to_string()));
    assert!(seen.contains(&"41".to_string()), "namespace disconnect sent: {seen:?}");
}

#[tokio::test]
async fn test_unsubscribed_listener_is_not_called() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_once(listener));

    let config = GatewayConfig::from_url(&format!("http://{addr}/api")).unwrap();
    let notifier = RealtimeNotifier::from_config(&config).unwrap();

    let (dropped_tx, mut dropped_rx) = mpsc::unbounded_channel::<QrUpdate>();
    let (kept_tx, mut kept_rx) = mpsc::unbounded_channel::<QrUpdate>();
    let dropped = notifier.on_qr(move |u| {
        let _ = dropped_tx.send(u.clone());
    });
    let _kept = notifier.on_qr(move |u| {
        let _ = kept_tx.send(u.clone());
    });
    dropped.unsubscribe();

    notifier.connect();
    notifier.join_session("sales").unwrap();

    timeout(WAIT, kept_rx.recv()).await.unwrap().unwrap();
    // The dropped listener's sender went away with it.
    assert!(dropped_rx.recv().await.is_none());

    notifier.disconnect();
    timeout(WAIT, server).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_server_namespace_disconnect_is_final() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (accepted_tx, mut accepted_rx) = mpsc::unbounded_channel::<()>();
    let server = tokio::spawn(async move {
        loop {
            let mut ws = accept_handshake(&listener).await;
            let _ = accepted_tx.send(());
            ws.send(Message::text("41")).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        }
    });

    let notifier =
        RealtimeNotifier::from_config(&config_with_backoff(addr, Duration::from_millis(50)))
            .unwrap();
    notifier.connect();

    timeout(WAIT, accepted_rx.recv()).await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let mut extra = 0;
    while accepted_rx.try_recv().is_ok() {
        extra += 1;
    }
    assert_eq!(extra, 0, "client reconnected after a server disconnect");
    assert!(!notifier.is_connected());

    notifier.disconnect();
    server.abort();
}

#[tokio::test]
async fn test_dropped_socket_reconnects_after_backoff_and_rejoins() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let mut first = accept_handshake(&listener).await;
        let closed_at = Instant::now();
        first.send(Message::Close(None)).await.unwrap();
        drop(first);

        let mut second = accept_handshake(&listener).await;
        let gap = closed_at.elapsed();
        let rejoin = next_text(&mut second).await;
        (gap, rejoin)
    });

    let notifier =
        RealtimeNotifier::from_config(&config_with_backoff(addr, Duration::from_millis(500)))
            .unwrap();
    notifier.connect();
    notifier.join_session("sales").unwrap();

    let (gap, rejoin) = timeout(WAIT, server).await.unwrap().unwrap();
    assert!(gap >= Duration::from_millis(400), "reconnected after only {gap:?}");
    assert_eq!(rejoin, r#"42["join-session","sales"]"#);

    notifier.disconnect();
}
