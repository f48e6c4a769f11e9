//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "trading")]
#[command(author, version, about = "Trend-following trading engine")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TRADING_CONFIG", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level, overrides logging.level from the configuration
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay historical bars through the engine
    Backtest(BacktestArgs),
    /// Trade simulated bars with simulated fills
    Paper(PaperArgs),
    /// Trade against a live broker
    Live,
    /// Start in the mode named by `run_mode`
    Run,
    /// Validate configuration and print the resolved settings
    ValidateConfig,
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// CSV file (single symbol) or directory of <SYMBOL>.csv files
    #[arg(short, long)]
    pub data: PathBuf,

    /// Symbols to replay (comma-separated), defaults to the configured list
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Save the JSON report to this file, with the equity curve next to it
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Keep positions open at the end of the data instead of closing them
    #[arg(long)]
    pub no_flatten: bool,

    /// Record trades and metrics in the configured storage directory
    #[arg(long)]
    pub persist: bool,
}

#[derive(clap::Args, Default)]
pub struct PaperArgs {
    /// Symbols to trade (comma-separated), defaults to the configured list
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Start from the configured equity instead of the stored account
    #[arg(long)]
    pub fresh: bool,
}
