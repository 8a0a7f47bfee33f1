//! Trade sinks
//!
//! Consumers of decoded [`TradeEvent`]s. The feed loop logs a sink failure and
//! moves on; a sink can never stop the feed.

mod channel;
mod log;

pub use self::channel::ChannelSink;
pub use self::log::LogSink;

use crate::protocol::TradeEvent;
use async_trait::async_trait;

/// Accepts one trade at a time
#[async_trait]
pub trait TradeSink: Send {
    async fn accept(&mut self, trade: &TradeEvent) -> anyhow::Result<()>;
}
