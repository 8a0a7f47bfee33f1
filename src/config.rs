//! Configuration types for poloniex-trades

use crate::registry::DEFAULT_CHANNELS;
use crate::telemetry::LogFormat;
use crate::ws::WsConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Poloniex public push API endpoint
pub const POLONIEX_WS_URL: &str = "wss://api2.poloniex.com/";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub credentials: Option<Credentials>,
    pub feed: FeedConfig,
    pub sink: SinkConfig,
    pub telemetry: TelemetryConfig,
}

/// API key pair. The public trade feed never signs anything with it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Push API connection and subscription settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub endpoint: String,
    /// Channel id -> pair symbol
    pub channels: BTreeMap<String, String>,
    /// 0 = reconnect forever
    pub max_reconnects: u32,
    pub initial_reconnect_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
    pub ping_interval_secs: u64,
    pub pong_timeout_secs: u64,
    /// How long shutdown waits for unsubscribe writes
    pub shutdown_grace_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: POLONIEX_WS_URL.to_string(),
            channels: DEFAULT_CHANNELS
                .iter()
                .map(|(id, pair)| (id.to_string(), pair.to_string()))
                .collect(),
            max_reconnects: 0,
            initial_reconnect_delay_ms: 1_000,
            max_reconnect_delay_ms: 60_000,
            ping_interval_secs: 30,
            pong_timeout_secs: 10,
            shutdown_grace_ms: 2_000,
        }
    }
}

impl FeedConfig {
    /// WebSocket client settings for this feed
    pub fn ws_config(&self) -> WsConfig {
        WsConfig::new(self.endpoint.clone())
            .max_reconnects(self.max_reconnects)
            .initial_delay(Duration::from_millis(self.initial_reconnect_delay_ms))
            .max_delay(Duration::from_millis(self.max_reconnect_delay_ms))
            .ping_interval(Duration::from_secs(self.ping_interval_secs))
            .pong_timeout(Duration::from_secs(self.pong_timeout_secs))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Trade sink configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub layout: SinkLayout,
}

/// How [`crate::sink::LogSink`] renders a trade
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkLayout {
    /// Separator plus one line per field
    #[default]
    Block,
    /// One event with structured fields
    Structured,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Serve Prometheus metrics on this port when set
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = &self.feed.endpoint;
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(ConfigError::Invalid(format!(
                "feed.endpoint must be a ws:// or wss:// URL, got {:?}",
                endpoint
            )));
        }

        if self.feed.channels.is_empty() {
            return Err(ConfigError::Invalid(
                "feed.channels must name at least one channel".to_string(),
            ));
        }

        if self.feed.initial_reconnect_delay_ms > self.feed.max_reconnect_delay_ms {
            return Err(ConfigError::Invalid(
                "feed.initial_reconnect_delay_ms exceeds feed.max_reconnect_delay_ms".to_string(),
            ));
        }

        Ok(())
    }
}
