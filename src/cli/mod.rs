//! CLI interface for poloniex-trades
//!
//! `poloniex-trades KEY SECRET` streams trades with the given credentials;
//! with no positional arguments the credentials come from the config file.

mod run;

pub use run::run;

use crate::config::{Config, ConfigError, Credentials};
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file read when `--config` is not given; may be absent
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

const VERSION_TEXT: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\n\nLicense MIT: <https://opensource.org/licenses/MIT>\n",
    "This is free software: you are free to change and redistribute it.\n",
    "There is NO WARRANTY, to the extent permitted by law."
);

#[derive(Parser, Debug)]
#[command(name = "poloniex-trades")]
#[command(about = "Stream executed trades from the Poloniex public WebSocket feed")]
#[command(version = VERSION_TEXT, disable_version_flag = true)]
pub struct Cli {
    /// API key (omit KEY and SECRET to read them from the config file)
    #[arg(requires = "secret")]
    pub key: Option<String>,

    /// API secret
    pub secret: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print version information and exit
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,
}

/// Invalid invocations detected after argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    #[error("no credentials: pass KEY and SECRET or add a [credentials] section to {0}")]
    MissingCredentials(String),
}

impl Cli {
    /// Load the config file
    ///
    /// A missing default `config.toml` yields the built-in defaults; a missing
    /// file named with `--config` is an error.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        match &self.config {
            Some(path) => Config::load(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH),
            None => Ok(Config::default()),
        }
    }

    /// Positional credentials win over the config file
    pub fn credentials(&self, config: &Config) -> Result<Credentials, CliError> {
        match (&self.key, &self.secret, &config.credentials) {
            (Some(key), Some(secret), _) => Ok(Credentials::new(key, secret)),
            (_, _, Some(credentials)) => Ok(credentials.clone()),
            _ => Err(CliError::MissingCredentials(self.config_path().display().to_string())),
        }
    }

    pub fn config_path(&self) -> &Path {
        self.config
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Rendered usage line, for invocation errors caught after parsing
    pub fn usage() -> String {
        Self::command().render_usage().to_string()
    }
}
