//! Trade event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One inbound push frame as received off the wire
///
/// Poloniex frames are positional JSON arrays, e.g.
/// `[121, 42, [["t", 0, 1, "100.5", "0.002", 1700000000]]]`.
pub type RawFrame = serde_json::Value;

/// Aggressor side of an executed trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Map the exchange's numeric side flag: exactly `1.0` is a buy,
    /// everything else (including NaN) is a sell
    pub fn from_flag(flag: f64) -> Self {
        if flag == 1.0 {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of market event carried by a [`TradeEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[default]
    Trade,
}

/// A single executed trade decoded from a push frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Trade sequence id (second element of the frame)
    pub id: i64,
    /// Trading pair resolved from the channel id (e.g., "BTC_USDT")
    pub pair: String,
    /// Aggressor side
    pub side: Side,
    /// Execution price
    pub price: f64,
    /// Executed amount in base currency
    pub amount: f64,
    /// Always [`EventKind::Trade`]
    pub event: EventKind,
    /// Exchange execution time, second precision
    pub timestamp: DateTime<Utc>,
}

/// Errors raised while decoding a push frame
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The frame does not follow the positional schema; the whole frame is dropped
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    /// A single trade entry carries a field that is not a usable number
    #[error("malformed {field} field: {value}")]
    MalformedField { field: &'static str, value: String },
}

impl DecodeError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::MalformedFrame(_) => "malformed_frame",
            DecodeError::MalformedField { .. } => "malformed_field",
        }
    }
}
