use clap::Parser;
use poloniex_trades::cli::{self, Cli};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and succeed; usage errors exit 1
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let credentials = match cli.credentials(&config) {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("error: {}\n\n{}", e, Cli::usage());
            return ExitCode::FAILURE;
        }
    };

    // Initialize telemetry
    if let Err(e) = poloniex_trades::telemetry::init_telemetry(&config.telemetry, cli.log_level.as_deref()) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!(endpoint = %config.feed.endpoint, "Starting trade stream");

    match cli::run(config, credentials).await {
        Ok(stats) => {
            tracing::info!(frames = stats.frames, trades = stats.trades, "Trade stream stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = ?e, "Trade stream failed");
            ExitCode::FAILURE
        }
    }
}
