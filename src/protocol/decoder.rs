//! Positional push frame decoder
//!
//! Frames look like `[channel_id, sequence, [update, ...]]` where each update
//! is itself a positional array tagged by its first element. Only executed
//! trades (`"t"`) are decoded; every other update kind is skipped.

use super::types::{DecodeError, EventKind, RawFrame, Side, TradeEvent};
use crate::registry::ChannelRegistry;
use chrono::{TimeZone, Utc};
use serde_json::Value;

/// Discriminator of an executed trade update
const TRADE_DISCRIMINATOR: &str = "t";

/// `["t", placeholder, side_flag, price, amount, unix_ts]`
const TRADE_ENTRY_LEN: usize = 6;

const SIDE_INDEX: usize = 2;
const PRICE_INDEX: usize = 3;
const AMOUNT_INDEX: usize = 4;
const TIMESTAMP_INDEX: usize = 5;

/// Outcome of decoding a single well-formed frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedFrame {
    /// Pair of the frame's channel, `None` when the channel is not registered
    pub pair: Option<String>,
    /// Trades extracted in wire order
    pub trades: Vec<TradeEvent>,
    /// Trade updates dropped because one of their fields was unusable
    pub rejected: Vec<DecodeError>,
}

impl DecodedFrame {
    /// True when the frame produced neither trades nor errors
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty() && self.rejected.is_empty()
    }
}

/// Decodes push frames against a channel registry
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder<'a> {
    registry: &'a ChannelRegistry,
}

impl<'a> FrameDecoder<'a> {
    pub fn new(registry: &'a ChannelRegistry) -> Self {
        Self { registry }
    }

    /// Decode one frame
    ///
    /// Frames from unregistered channels (heartbeats, other feeds) decode to an
    /// empty result. A frame that breaks the positional schema is rejected as a
    /// whole with [`DecodeError::MalformedFrame`]; a trade update with an
    /// unparseable number is dropped on its own and reported in
    /// [`DecodedFrame::rejected`].
    pub fn decode(&self, frame: &RawFrame) -> Result<DecodedFrame, DecodeError> {
        let elements = frame.as_array().ok_or_else(|| {
            DecodeError::MalformedFrame(format!("expected an array, got {}", json_type(frame)))
        })?;

        let first = elements
            .first()
            .ok_or_else(|| DecodeError::MalformedFrame("empty frame".to_string()))?;

        let Some(pair) = channel_key(first).and_then(|id| self.registry.resolve(&id)) else {
            return Ok(DecodedFrame::default());
        };

        let mut decoded = DecodedFrame {
            pair: Some(pair.to_string()),
            ..Default::default()
        };

        let (Some(sequence), Some(updates)) = (elements.get(1), elements.get(2)) else {
            return Ok(decoded);
        };

        let updates = updates.as_array().ok_or_else(|| {
            DecodeError::MalformedFrame(format!(
                "expected an update list, got {}",
                json_type(updates)
            ))
        })?;

        for (index, update) in updates.iter().enumerate() {
            let entry = update.as_array().ok_or_else(|| {
                DecodeError::MalformedFrame(format!("update {} is not an array", index))
            })?;

            let discriminator = entry.first().ok_or_else(|| {
                DecodeError::MalformedFrame(format!("update {} is empty", index))
            })?;

            if discriminator.as_str() != Some(TRADE_DISCRIMINATOR) {
                continue;
            }

            if entry.len() < TRADE_ENTRY_LEN {
                return Err(DecodeError::MalformedFrame(format!(
                    "trade update {} has {} fields, expected {}",
                    index,
                    entry.len(),
                    TRADE_ENTRY_LEN
                )));
            }

            match decode_trade(pair, sequence, entry) {
                Ok(trade) => decoded.trades.push(trade),
                Err(e) => decoded.rejected.push(e),
            }
        }

        Ok(decoded)
    }
}

fn decode_trade(pair: &str, sequence: &Value, entry: &[Value]) -> Result<TradeEvent, DecodeError> {
    let id = coerce_i64(sequence).ok_or_else(|| malformed("id", sequence))?;

    let side_flag = &entry[SIDE_INDEX];
    let side = coerce_f64(side_flag)
        .map(Side::from_flag)
        .ok_or_else(|| malformed("side", side_flag))?;

    let price = finite_field(&entry[PRICE_INDEX], "price")?;
    let amount = finite_field(&entry[AMOUNT_INDEX], "amount")?;

    let raw_ts = &entry[TIMESTAMP_INDEX];
    let seconds = finite_field(raw_ts, "timestamp")?;
    let timestamp = Utc
        .timestamp_opt(seconds.trunc() as i64, 0)
        .single()
        .ok_or_else(|| malformed("timestamp", raw_ts))?;

    Ok(TradeEvent {
        id,
        pair: pair.to_string(),
        side,
        price,
        amount,
        event: EventKind::Trade,
        timestamp,
    })
}

/// Channel ids arrive as JSON numbers but are registered as strings
fn channel_key(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(|id| id.to_string())
            .or_else(|| n.as_u64().map(|id| id.to_string()))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| (f as i64).to_string())
            }),
        Value::String(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Numbers may be sent as JSON numbers or as decimal strings
fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn coerce_i64(value: &Value) -> Option<i64> {
    let from_float = |f: f64| {
        (f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64).then(|| f.trunc() as i64)
    };

    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(from_float)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    }
}

fn finite_field(value: &Value, field: &'static str) -> Result<f64, DecodeError> {
    coerce_f64(value)
        .filter(|f| f.is_finite())
        .ok_or_else(|| malformed(field, value))
}

fn malformed(field: &'static str, value: &Value) -> DecodeError {
    DecodeError::MalformedField {
        field,
        value: value.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
