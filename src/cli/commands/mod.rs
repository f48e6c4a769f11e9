//! CLI command implementations.

pub mod backtest;
pub mod live;
pub mod paper;
pub mod validate;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};
use trading_config::AppConfig;
use trading_core::types::RunMode;
use trading_engine::TradingEngine;
use trading_risk::{RiskManager, TrailingStopManager};
use trading_strategies::SmaCrossover;

use crate::cli::PaperArgs;

/// Dispatch on the configured `run_mode`.
pub async fn run_configured(config: &AppConfig) -> Result<()> {
    match config.run_mode {
        RunMode::Paper => paper::run(PaperArgs::default(), config).await,
        RunMode::Live => live::run(config).await,
        RunMode::Backtest => {
            bail!("run_mode = \"backtest\" needs historical data; use `trading backtest --data <path>`")
        }
    }
}

fn symbols_or_configured(requested: &[String], config: &AppConfig) -> Vec<String> {
    if requested.is_empty() {
        config.symbols.clone()
    } else {
        requested.to_vec()
    }
}

fn risk_manager(config: &AppConfig) -> RiskManager {
    RiskManager::new(config.risk.clone(), config.dynamic_sizing.clone())
}

/// One engine per symbol, all sharing the configured strategy and stops.
fn build_engines(symbols: &[String], config: &AppConfig) -> Result<Vec<TradingEngine>> {
    let timeframe = config.timeframe()?;
    symbols
        .iter()
        .map(|symbol| {
            let strategy = SmaCrossover::new(config.strategy.clone())
                .with_context(|| format!("Failed to create strategy for {}", symbol))?;
            Ok(TradingEngine::new(
                symbol.clone(),
                timeframe,
                Box::new(strategy),
                TrailingStopManager::new(config.trailing_stop.clone()),
            )
            .with_volatility_lookback(config.dynamic_sizing.volatility_lookback))
        })
        .collect()
}

/// Shutdown flag flipped by Ctrl-C.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested, finishing the current cycle");
                let _ = tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                // keep the sender alive so the run is not cut short
                std::future::pending::<()>().await;
            }
        }
    });
    rx
}
