//! Process-level run outcomes

use crate::support::dead_url;
use poloniex_trades::cli;
use poloniex_trades::config::{Config, Credentials};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;

#[tokio::test]
async fn test_run_fails_when_reconnects_are_exhausted() {
    // Bind a port, then serve exactly one session so every re-dial is refused
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            // Drop the session right after the handshake
            let _ = tokio_tungstenite::accept_async(stream).await;
        }
    });

    let mut config = Config::default();
    config.feed.endpoint = format!("ws://{}", addr);
    config.feed.max_reconnects = 2;
    config.feed.initial_reconnect_delay_ms = 10;
    config.feed.max_reconnect_delay_ms = 20;
    config.feed.shutdown_grace_ms = 100;

    let result = timeout(
        Duration::from_secs(10),
        cli::run(config, Credentials::new("key", "secret")),
    )
    .await
    .expect("run did not give up");

    let err = result.unwrap_err();
    assert!(err.to_string().contains("exhausting reconnect attempts"));
}

#[tokio::test]
async fn test_run_fails_on_initial_connect() {
    let mut config = Config::default();
    config.feed.endpoint = dead_url().await;

    let result = cli::run(config, Credentials::new("key", "secret")).await;
    assert!(result.is_err());
}
