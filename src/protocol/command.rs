//! Subscribe / unsubscribe commands

use serde::{Deserialize, Serialize};

/// Subscription verb understood by the push API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Subscribe,
    Unsubscribe,
}

/// `{"command": "subscribe", "channel": "121"}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionCommand {
    pub command: CommandKind,
    pub channel: String,
}

impl SubscriptionCommand {
    pub fn subscribe(channel: impl Into<String>) -> Self {
        Self {
            command: CommandKind::Subscribe,
            channel: channel.into(),
        }
    }

    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        Self {
            command: CommandKind::Unsubscribe,
            channel: channel.into(),
        }
    }

    /// Serialize into a single text frame
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a text frame produced by [`SubscriptionCommand::to_json`]
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
