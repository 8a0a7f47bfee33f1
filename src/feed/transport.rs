//! [`Transport`] over the reconnecting WebSocket client

use super::{Transport, TransportError, TransportEvent};
use crate::protocol::SubscriptionCommand;
use crate::ws::{WsClient, WsConfig, WsConnection, WsMessage};
use async_trait::async_trait;

/// Dial the push API endpoint named in `config`
pub async fn open(config: WsConfig) -> Result<WsConnection, TransportError> {
    tracing::info!(url = %config.url, "Opening push API transport");
    WsClient::new(config)
        .open()
        .await
        .map_err(TransportError::Connect)
}

#[async_trait]
impl Transport for WsConnection {
    async fn send(&self, command: &SubscriptionCommand) -> Result<(), TransportError> {
        let text = command.to_json().map_err(TransportError::Encode)?;
        self.send_text(text).await.map_err(TransportError::Write)
    }

    async fn receive(&mut self) -> Option<Result<TransportEvent, TransportError>> {
        loop {
            let event = match self.recv().await? {
                WsMessage::Text(text) => serde_json::from_str(&text)
                    .map(TransportEvent::Frame)
                    .map_err(TransportError::Decode),
                WsMessage::Binary(data) => serde_json::from_slice(&data)
                    .map(TransportEvent::Frame)
                    .map_err(TransportError::Decode),
                WsMessage::ReadFailed(reason) => Err(TransportError::Read(reason)),
                WsMessage::Reconnected => Ok(TransportEvent::Reconnected),
                WsMessage::Reconnecting { attempt } => {
                    tracing::debug!(attempt, url = %self.url(), "Transport reconnecting");
                    continue;
                }
                WsMessage::Disconnected => return None,
            };
            return Some(event);
        }
    }

    fn close(&self) {
        WsConnection::close(self);
    }
}
