//! Poloniex push API wire protocol
//!
//! Subscription commands going out, positional trade frames coming in.

mod command;
mod decoder;
mod types;

pub use command::{CommandKind, SubscriptionCommand};
pub use decoder::{DecodedFrame, FrameDecoder};
pub use types::{DecodeError, EventKind, RawFrame, Side, TradeEvent};
