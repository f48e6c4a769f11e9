//! Validate configuration command.

use anyhow::{Context, Result};
use std::path::Path;
use trading_config::AppConfig;

/// Loading already validated `config`; this prints what was resolved.
pub fn run(config_path: &Path, config: &AppConfig) -> Result<()> {
    println!("Configuration is valid: {}", config_path.display());
    println!();
    println!("Mode: {}", config.run_mode);
    println!("Symbols: {}", config.symbols.join(", "));
    println!(
        "Strategy: SMA {}/{}",
        config.strategy.fast_period, config.strategy.slow_period
    );
    println!();
    let rendered = config.to_toml().context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}
