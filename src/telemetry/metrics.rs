//! Feed counters, optionally exported to Prometheus

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Counter metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCounter {
    /// Frames read off the transport
    Frames,
    /// Trades handed to the sink
    Trades,
    /// Frames or trade updates dropped by the decoder
    DecodeErrors,
    /// Transport read failures
    ReadErrors,
    /// Failed subscribe/unsubscribe writes
    WriteErrors,
    /// Sink failures
    SinkErrors,
    /// Automatic reconnects
    Reconnects,
}

impl FeedCounter {
    pub const ALL: [FeedCounter; 7] = [
        FeedCounter::Frames,
        FeedCounter::Trades,
        FeedCounter::DecodeErrors,
        FeedCounter::ReadErrors,
        FeedCounter::WriteErrors,
        FeedCounter::SinkErrors,
        FeedCounter::Reconnects,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeedCounter::Frames => "poloniex_frames_total",
            FeedCounter::Trades => "poloniex_trades_total",
            FeedCounter::DecodeErrors => "poloniex_decode_errors_total",
            FeedCounter::ReadErrors => "poloniex_read_errors_total",
            FeedCounter::WriteErrors => "poloniex_write_errors_total",
            FeedCounter::SinkErrors => "poloniex_sink_errors_total",
            FeedCounter::Reconnects => "poloniex_reconnects_total",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            FeedCounter::Frames => "Frames received from the push API",
            FeedCounter::Trades => "Trades decoded and forwarded, by pair",
            FeedCounter::DecodeErrors => "Frames or trade updates dropped, by kind",
            FeedCounter::ReadErrors => "Transport read failures",
            FeedCounter::WriteErrors => "Failed subscription command writes",
            FeedCounter::SinkErrors => "Trades the sink failed to accept",
            FeedCounter::Reconnects => "Automatic reconnects of the push API session",
        }
    }
}

/// Register help text for every counter
pub fn describe_metrics() {
    for counter in FeedCounter::ALL {
        ::metrics::describe_counter!(counter.name(), counter.description());
    }
}

/// Bump a counter by one
pub fn increment(counter: FeedCounter) {
    ::metrics::counter!(counter.name()).increment(1);
}

/// Bump a counter by one under a single label
pub fn increment_labeled(counter: FeedCounter, key: &'static str, value: impl Into<String>) {
    ::metrics::counter!(counter.name(), key => value.into()).increment(1);
}

/// Serve `/metrics` on the given port
pub fn install_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to start metrics exporter on {}", addr))?;

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}
