//! Log every trade through `tracing`

use super::TradeSink;
use crate::config::SinkLayout;
use crate::protocol::TradeEvent;
use async_trait::async_trait;

const SEPARATOR: &str = "============================================================";

/// Default sink: writes each trade to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink {
    layout: SinkLayout,
}

impl LogSink {
    pub fn new(layout: SinkLayout) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl TradeSink for LogSink {
    async fn accept(&mut self, trade: &TradeEvent) -> anyhow::Result<()> {
        match self.layout {
            SinkLayout::Block => {
                tracing::info!("{}", SEPARATOR);
                tracing::info!("ID: {}", trade.id);
                tracing::info!("Pair: {}", trade.pair);
                tracing::info!("Price: {}", trade.price);
                tracing::info!("Amount: {}", trade.amount);
                tracing::info!("Side: {}", trade.side);
                tracing::info!("Timestamp: {}", trade.timestamp);
            }
            SinkLayout::Structured => {
                tracing::info!(
                    id = trade.id,
                    pair = %trade.pair,
                    price = trade.price,
                    amount = trade.amount,
                    side = %trade.side,
                    timestamp = %trade.timestamp,
                    "trade"
                );
            }
        }
        Ok(())
    }
}
