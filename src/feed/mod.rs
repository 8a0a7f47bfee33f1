//! Trade feed module
//!
//! Drives the Poloniex push API: subscribes to the registered channels, reads
//! frames off a [`Transport`], decodes trades and hands them to a sink.

mod trades;
mod transport;

pub use trades::{FeedStats, StopReason, TradeFeed};
pub use transport::open;

use crate::protocol::{RawFrame, SubscriptionCommand};
use crate::ws::WsError;
use async_trait::async_trait;
use thiserror::Error;

/// Something read off a [`Transport`]
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// One decoded JSON frame
    Frame(RawFrame),
    /// The connection was re-established; server-side subscriptions are gone
    Reconnected,
}

/// Transport failures
#[derive(Debug, Error)]
pub enum TransportError {
    /// Initial dial failed
    #[error("connect failed: {0}")]
    Connect(#[source] WsError),
    /// A command could not be written
    #[error("write failed: {0}")]
    Write(#[source] WsError),
    /// The session broke while reading
    #[error("read failed: {0}")]
    Read(String),
    /// A frame arrived that is not JSON
    #[error("undecodable frame: {0}")]
    Decode(#[source] serde_json::Error),
    /// A command could not be serialized
    #[error("unencodable command: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Full-duplex, self-reconnecting connection to the push API
#[async_trait]
pub trait Transport: Send {
    /// Write one subscription command as a single text frame
    async fn send(&self, command: &SubscriptionCommand) -> Result<(), TransportError>;

    /// Wait for the next frame, reconnect notice or read error.
    /// Returns `None` once the transport is closed.
    async fn receive(&mut self) -> Option<Result<TransportEvent, TransportError>>;

    /// Stop writing and release the connection. Idempotent, never blocks.
    fn close(&self);
}
