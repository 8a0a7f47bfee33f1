//! poloniex-trades: executed trades from the Poloniex public push API
//!
//! This library provides:
//! - A reconnecting WebSocket client with ping/pong keepalive
//! - The push API wire protocol (subscription commands, positional trade frames)
//! - A static channel registry mapping channel ids to pairs
//! - A single-worker feed that subscribes, decodes and forwards trades to a sink
//! - Configuration, CLI and telemetry for the `poloniex-trades` binary

pub mod cli;
pub mod config;
pub mod feed;
pub mod protocol;
pub mod registry;
pub mod sink;
pub mod telemetry;
pub mod ws;
