//! Telemetry module
//!
//! Structured logging and feed counters

mod logging;
mod metrics;

pub use self::logging::{init_logging, LogFormat};
pub use self::metrics::{describe_metrics, increment, increment_labeled, install_exporter, FeedCounter};

use crate::config::TelemetryConfig;

/// Initialize all telemetry subsystems
///
/// `level_override` takes precedence over the configured log level; `RUST_LOG`
/// takes precedence over both.
pub fn init_telemetry(config: &TelemetryConfig, level_override: Option<&str>) -> anyhow::Result<()> {
    init_logging(level_override.unwrap_or(&config.log_level), config.log_format)?;

    describe_metrics();
    if let Some(port) = config.metrics_port {
        install_exporter(port)?;
    }

    Ok(())
}
