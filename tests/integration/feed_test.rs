//! End-to-end feed tests against the mock push API

use crate::support::{spawn_server, TIMEOUT};
use futures_util::{SinkExt, StreamExt};
use poloniex_trades::feed::{self, TradeFeed};
use poloniex_trades::protocol::{CommandKind, Side, SubscriptionCommand};
use poloniex_trades::registry::ChannelRegistry;
use poloniex_trades::sink::ChannelSink;
use poloniex_trades::ws::WsConfig;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

/// Mock exchange: reports every command it receives and answers a subscribe to
/// BTC_USDT with one trade, one malformed frame and a heartbeat
async fn mock_exchange() -> (String, mpsc::UnboundedReceiver<SubscriptionCommand>) {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();

    let url = spawn_server(move |mut ws, _| {
        let commands_tx = commands_tx.clone();
        async move {
            while let Some(Ok(msg)) = ws.next().await {
                let Message::Text(text) = msg else { continue };
                let Ok(command) = SubscriptionCommand::from_json(&text) else {
                    continue;
                };

                let reply = command.command == CommandKind::Subscribe && command.channel == "121";
                let _ = commands_tx.send(command);

                if reply {
                    let frames = [
                        r#"[121, 42, [["t", 0, 1, "100.5", "0.002", 1700000000]]]"#,
                        r#"[121, 43, [["t", 0, 0, "abc", "1", 1700000001]]]"#,
                        r#"[1010]"#,
                        r#"[121, 44, [["o", 1, "99.0", "5"], ["t", 0, 0, "100.25", "0.5", 1700000002]]]"#,
                    ];
                    for frame in frames {
                        if ws.send(Message::Text(frame.to_string())).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    })
    .await;

    (url, commands_rx)
}

#[tokio::test]
async fn test_feed_end_to_end() {
    let (url, mut commands) = mock_exchange().await;

    let transport = feed::open(WsConfig::new(url)).await.unwrap();
    let registry = Arc::new(ChannelRegistry::default());
    let (sink, mut trades) = ChannelSink::channel(16);
    let mut trade_feed = TradeFeed::new(transport, registry.clone(), sink)
        .with_shutdown_grace(Duration::from_secs(1));

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let running = tokio::spawn(async move {
        trade_feed
            .run(async {
                let _ = cancel_rx.await;
            })
            .await
    });

    let first = timeout(TIMEOUT, trades.recv()).await.unwrap().unwrap();
    assert_eq!(first.id, 42);
    assert_eq!(first.pair, "BTC_USDT");
    assert_eq!(first.side, Side::Buy);
    assert_eq!(first.price, 100.5);
    assert_eq!(first.amount, 0.002);
    assert_eq!(first.timestamp.timestamp(), 1_700_000_000);

    let second = timeout(TIMEOUT, trades.recv()).await.unwrap().unwrap();
    assert_eq!(second.id, 44);
    assert_eq!(second.side, Side::Sell);
    assert_eq!(second.price, 100.25);

    cancel_tx.send(()).unwrap();
    let stats = timeout(TIMEOUT, running).await.unwrap().unwrap();

    assert_eq!(stats.frames, 4);
    assert_eq!(stats.trades, 2);
    assert_eq!(stats.rejected_updates, 1);
    assert_eq!(stats.dropped_frames, 0);

    // Every channel subscribed once, then unsubscribed once
    let n = registry.len();
    let mut received = Vec::new();
    while received.len() < 2 * n {
        let command = timeout(TIMEOUT, commands.recv()).await.unwrap().unwrap();
        received.push(command);
    }

    let (subs, unsubs) = received.split_at(n);
    let channels: HashSet<&str> = registry.entries().map(|(id, _)| id).collect();

    assert!(subs.iter().all(|c| c.command == CommandKind::Subscribe));
    assert!(unsubs.iter().all(|c| c.command == CommandKind::Unsubscribe));
    assert_eq!(subs.iter().map(|c| c.channel.as_str()).collect::<HashSet<_>>(), channels);
    assert_eq!(unsubs.iter().map(|c| c.channel.as_str()).collect::<HashSet<_>>(), channels);
}

#[tokio::test]
async fn test_feed_resubscribes_after_reconnect() {
    let (commands_tx, mut commands) = mpsc::unbounded_channel();

    let url = spawn_server(move |mut ws, session| {
        let commands_tx = commands_tx.clone();
        async move {
            let mut seen = 0;
            while let Some(Ok(msg)) = ws.next().await {
                let Message::Text(text) = msg else { continue };
                if let Ok(command) = SubscriptionCommand::from_json(&text) {
                    let _ = commands_tx.send((session, command));
                    seen += 1;
                }
                // Kick the first client once it has subscribed everything
                if session == 0 && seen == 3 {
                    return;
                }
            }
        }
    })
    .await;

    let config = WsConfig::new(url).initial_delay(Duration::from_millis(10));
    let transport = feed::open(config).await.unwrap();
    let (sink, _trades) = ChannelSink::channel(16);
    let mut trade_feed = TradeFeed::new(transport, Arc::new(ChannelRegistry::default()), sink);

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let running = tokio::spawn(async move {
        trade_feed
            .run(async {
                let _ = cancel_rx.await;
            })
            .await
    });

    let mut resubscribed = HashSet::new();
    timeout(TIMEOUT, async {
        while resubscribed.len() < 3 {
            let (session, command) = commands.recv().await.unwrap();
            if session == 1 && command.command == CommandKind::Subscribe {
                resubscribed.insert(command.channel);
            }
        }
    })
    .await
    .expect("feed did not resubscribe after reconnect");

    cancel_tx.send(()).unwrap();
    let stats = timeout(TIMEOUT, running).await.unwrap().unwrap();
    assert_eq!(stats.reconnects, 1);
    assert!(stats.read_errors >= 1);
}
