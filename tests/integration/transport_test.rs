//! Transport integration tests over a local WebSocket server

use crate::support::{dead_url, spawn_server, TIMEOUT};
use futures_util::{SinkExt, StreamExt};
use poloniex_trades::feed::{self, Transport, TransportError, TransportEvent};
use poloniex_trades::protocol::SubscriptionCommand;
use poloniex_trades::ws::{WsConfig, WsError};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

fn fast_config(url: String) -> WsConfig {
    WsConfig::new(url)
        .initial_delay(Duration::from_millis(10))
        .max_delay(Duration::from_millis(50))
}

#[tokio::test]
async fn test_open_fails_on_dead_endpoint() {
    let result = feed::open(fast_config(dead_url().await)).await;
    assert!(matches!(result, Err(TransportError::Connect(_))));
}

#[tokio::test]
async fn test_subscribe_command_reaches_server() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let url = spawn_server(move |mut ws, _| {
        let seen_tx = seen_tx.clone();
        async move {
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(text) = msg {
                    let _ = seen_tx.send(text);
                }
            }
        }
    })
    .await;

    let transport = feed::open(fast_config(url)).await.unwrap();
    transport
        .send(&SubscriptionCommand::subscribe("121"))
        .await
        .unwrap();

    let text = timeout(TIMEOUT, seen_rx.recv()).await.unwrap().unwrap();
    assert_eq!(text, r#"{"command":"subscribe","channel":"121"}"#);
    assert_eq!(
        SubscriptionCommand::from_json(&text).unwrap(),
        SubscriptionCommand::subscribe("121")
    );
}

#[tokio::test]
async fn test_receive_decodes_json_frames() {
    let url = spawn_server(|mut ws, _| async move {
        let frame = r#"[121, 42, [["t", 0, 1, "100.5", "0.002", 1700000000]]]"#;
        ws.send(Message::Text(frame.to_string())).await.unwrap();
        ws.send(Message::Text("not json".to_string())).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;

    let mut transport = feed::open(fast_config(url)).await.unwrap();

    let event = timeout(TIMEOUT, transport.receive()).await.unwrap();
    assert_eq!(
        event.unwrap().unwrap(),
        TransportEvent::Frame(json!([121, 42, [["t", 0, 1, "100.5", "0.002", 1700000000]]]))
    );

    let event = timeout(TIMEOUT, transport.receive()).await.unwrap();
    assert!(matches!(event, Some(Err(TransportError::Decode(_)))));
}

#[tokio::test]
async fn test_reconnects_after_server_drop() {
    let url = spawn_server(|mut ws, session| async move {
        if session == 0 {
            // Drop the first session without a closing handshake
            return;
        }
        ws.send(Message::Text("[1010]".to_string())).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;

    let mut transport = feed::open(fast_config(url)).await.unwrap();

    let mut saw_read_error = false;
    let mut saw_reconnect = false;
    let outcome = timeout(TIMEOUT, async {
        while let Some(event) = transport.receive().await {
            match event {
                Err(TransportError::Read(_)) => saw_read_error = true,
                Ok(TransportEvent::Reconnected) => saw_reconnect = true,
                Ok(TransportEvent::Frame(frame)) => return Some(frame),
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        None
    })
    .await
    .expect("Test timed out");

    assert!(saw_read_error);
    assert!(saw_reconnect);
    assert_eq!(outcome, Some(json!([1010])));
}

#[tokio::test]
async fn test_close_handle_unblocks_pending_receive() {
    let url = spawn_server(|mut ws, _| async move {
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;

    let mut transport = feed::open(fast_config(url)).await.unwrap();
    let handle = transport.close_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.close();
    });

    let event = timeout(TIMEOUT, transport.receive())
        .await
        .expect("receive stayed blocked after close");
    assert!(event.is_none());
}

#[tokio::test]
async fn test_send_after_close_is_write_error() {
    let url = spawn_server(|mut ws, _| async move {
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;

    let transport = feed::open(fast_config(url)).await.unwrap();
    Transport::close(&transport);
    Transport::close(&transport);

    let result = transport
        .send(&SubscriptionCommand::unsubscribe("121"))
        .await;
    assert!(matches!(
        result,
        Err(TransportError::Write(WsError::ChannelClosed))
    ));
}
