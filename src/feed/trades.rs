//! Subscribe, read, decode, forward

use super::{Transport, TransportEvent};
use crate::protocol::{CommandKind, DecodeError, FrameDecoder, RawFrame};
use crate::registry::ChannelRegistry;
use crate::sink::TradeSink;
use crate::telemetry::{self, FeedCounter};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Why a [`TradeFeed::run`] returned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown future resolved
    #[default]
    Cancelled,
    /// The transport gave up reconnecting
    TransportClosed,
}

/// Counters for one [`TradeFeed::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub stopped_by: StopReason,
    pub frames: u64,
    pub trades: u64,
    pub dropped_frames: u64,
    pub rejected_updates: u64,
    pub read_errors: u64,
    pub write_errors: u64,
    pub sink_errors: u64,
    pub reconnects: u64,
}

/// Single-worker trade pipeline over one transport
pub struct TradeFeed<T, S> {
    transport: T,
    registry: Arc<ChannelRegistry>,
    sink: S,
    shutdown_grace: Duration,
    stats: FeedStats,
}

impl<T: Transport, S: TradeSink> TradeFeed<T, S> {
    pub fn new(transport: T, registry: Arc<ChannelRegistry>, sink: S) -> Self {
        Self {
            transport,
            registry,
            sink,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            stats: FeedStats::default(),
        }
    }

    /// Bound on how long shutdown spends sending unsubscribe commands
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn stats(&self) -> FeedStats {
        self.stats
    }

    /// Run until `shutdown` resolves or the transport closes
    ///
    /// Subscribes to every registered channel first and again after each
    /// reconnect. Frames are handled strictly in arrival order. Whatever ends
    /// the loop, every channel is then unsubscribed (best effort, bounded by the
    /// shutdown grace) and the transport is closed.
    pub async fn run<F>(&mut self, shutdown: F) -> FeedStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(channels = self.registry.len(), "Starting trade feed");
        self.send_all(CommandKind::Subscribe).await;

        loop {
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping trade feed");
                    break;
                }
                event = self.transport.receive() => event,
            };

            match event {
                Some(Ok(TransportEvent::Frame(frame))) => self.handle_frame(&frame).await,
                Some(Ok(TransportEvent::Reconnected)) => {
                    self.stats.reconnects += 1;
                    telemetry::increment(FeedCounter::Reconnects);
                    tracing::info!("Transport reconnected, resubscribing");
                    self.send_all(CommandKind::Subscribe).await;
                }
                Some(Err(e)) => {
                    self.stats.read_errors += 1;
                    telemetry::increment(FeedCounter::ReadErrors);
                    tracing::warn!(error = %e, "Transport read failed");
                }
                None => {
                    tracing::warn!("Transport closed, stopping trade feed");
                    self.stats.stopped_by = StopReason::TransportClosed;
                    break;
                }
            }
        }

        let grace = self.shutdown_grace;
        if tokio::time::timeout(grace, self.send_all(CommandKind::Unsubscribe))
            .await
            .is_err()
        {
            tracing::warn!(grace_ms = grace.as_millis() as u64, "Unsubscribe did not finish in time");
        }
        self.transport.close();

        tracing::info!(stats = ?self.stats, "Trade feed stopped");
        self.stats
    }

    async fn send_all(&mut self, kind: CommandKind) {
        for command in self.registry.commands(kind) {
            match self.transport.send(&command).await {
                Ok(()) => {
                    tracing::debug!(
                        channel = %command.channel,
                        pair = ?self.registry.resolve(&command.channel),
                        ?kind,
                        "Sent subscription command"
                    );
                }
                Err(e) => {
                    self.stats.write_errors += 1;
                    telemetry::increment(FeedCounter::WriteErrors);
                    tracing::warn!(
                        error = %e,
                        channel = %command.channel,
                        ?kind,
                        "Subscription command failed"
                    );
                }
            }
        }
    }

    async fn handle_frame(&mut self, frame: &RawFrame) {
        self.stats.frames += 1;
        telemetry::increment(FeedCounter::Frames);

        let decoded = match FrameDecoder::new(&self.registry).decode(frame) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.stats.dropped_frames += 1;
                record_decode_error(&e);
                tracing::warn!(error = %e, %frame, "Dropping malformed frame");
                return;
            }
        };

        for e in &decoded.rejected {
            self.stats.rejected_updates += 1;
            record_decode_error(e);
            tracing::warn!(error = %e, pair = ?decoded.pair, "Dropping trade update");
        }

        for trade in &decoded.trades {
            self.stats.trades += 1;
            telemetry::increment_labeled(FeedCounter::Trades, "pair", trade.pair.as_str());

            if let Err(e) = self.sink.accept(trade).await {
                self.stats.sink_errors += 1;
                telemetry::increment(FeedCounter::SinkErrors);
                tracing::warn!(error = %e, trade_id = trade.id, pair = %trade.pair, "Trade sink failed");
            }
        }
    }
}

fn record_decode_error(e: &DecodeError) {
    telemetry::increment_labeled(FeedCounter::DecodeErrors, "kind", e.kind());
}
