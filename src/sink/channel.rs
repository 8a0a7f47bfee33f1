//! Forward trades into a tokio channel

use super::TradeSink;
use crate::protocol::TradeEvent;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Sink that pushes every trade into an `mpsc` channel
pub struct ChannelSink {
    tx: mpsc::Sender<TradeEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<TradeEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TradeEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl TradeSink for ChannelSink {
    async fn accept(&mut self, trade: &TradeEvent) -> anyhow::Result<()> {
        self.tx
            .send(trade.clone())
            .await
            .map_err(|_| anyhow::anyhow!("trade receiver dropped"))
    }
}
