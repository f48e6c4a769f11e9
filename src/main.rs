//! Trading engine CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use trading_config::{load_config, LogFormat};
use trading_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .unwrap_or_else(|| config.logging.level.clone());
    let json = cli.json_logs || config.logging.format == LogFormat::Json;
    let _guard = setup_logging(&level, json, config.logging.file.as_deref());

    match cli.command {
        Commands::Backtest(args) => cli::commands::backtest::run(args, &config).await,
        Commands::Paper(args) => cli::commands::paper::run(args, &config).await,
        Commands::Live => cli::commands::live::run(&config).await,
        Commands::Run => cli::commands::run_configured(&config).await,
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config, &config),
    }
}
