//! Channel id to trading pair mapping

use crate::config::FeedConfig;
use crate::protocol::{CommandKind, SubscriptionCommand};
use std::collections::BTreeMap;

/// Channels subscribed to when the configuration does not name any
pub const DEFAULT_CHANNELS: [(&str, &str); 3] =
    [("121", "BTC_USDT"), ("256", "TRX_USDT"), ("149", "ETH_USDT")];

/// Immutable table of push channels and the pairs they carry
///
/// Built once at startup and shared by reference; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRegistry {
    channels: BTreeMap<String, String>,
}

impl ChannelRegistry {
    /// Build a registry from `(channel_id, pair)` pairs. Later duplicates win.
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            channels: entries
                .into_iter()
                .map(|(id, pair)| (id.into(), pair.into()))
                .collect(),
        }
    }

    /// Registry for the configured channel table
    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            channels: config.channels.clone(),
        }
    }

    /// All `(channel_id, pair)` entries. Order carries no meaning.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.channels
            .iter()
            .map(|(id, pair)| (id.as_str(), pair.as_str()))
    }

    /// Look up the pair carried by a channel
    pub fn resolve(&self, channel_id: &str) -> Option<&str> {
        self.channels.get(channel_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// One command of the given kind per registered channel
    pub fn commands(&self, kind: CommandKind) -> Vec<SubscriptionCommand> {
        self.channels
            .keys()
            .map(|id| SubscriptionCommand {
                command: kind,
                channel: id.clone(),
            })
            .collect()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNELS)
    }
}
