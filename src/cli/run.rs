//! Stream trades until Ctrl-C

use crate::config::{Config, Credentials};
use crate::feed::{self, FeedStats, StopReason, TradeFeed};
use crate::registry::ChannelRegistry;
use crate::sink::LogSink;
use anyhow::Context;
use std::sync::Arc;

/// Connect, stream trades into the log sink, and unwind cleanly on Ctrl-C
///
/// A failed initial connect and a transport that gave up reconnecting are
/// errors; everything else is logged and survived.
pub async fn run(config: Config, credentials: Credentials) -> anyhow::Result<FeedStats> {
    // Public channels only: the key pair is accepted but never used to sign
    tracing::debug!(key = %credentials.key, "Credentials loaded");

    let registry = Arc::new(ChannelRegistry::from_config(&config.feed));
    let transport = feed::open(config.feed.ws_config())
        .await
        .with_context(|| format!("Could not connect to {}", config.feed.endpoint))?;

    let sink = LogSink::new(config.sink.layout);
    let mut trade_feed = TradeFeed::new(transport, registry, sink)
        .with_shutdown_grace(config.feed.shutdown_grace());

    let stats = trade_feed
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Could not listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    if stats.stopped_by == StopReason::TransportClosed {
        anyhow::bail!(
            "Connection to {} lost after exhausting reconnect attempts ({} frames, {} trades)",
            config.feed.endpoint,
            stats.frames,
            stats.trades
        );
    }

    Ok(stats)
}
