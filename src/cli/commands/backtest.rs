//! Backtest command implementation.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;
use trading_broker::PaperExecutor;
use trading_config::AppConfig;
use trading_data::load_symbols;
use trading_engine::{HistoricalBarSource, Runner, RunnerConfig};
use trading_metrics::PerformanceReport;
use trading_store::{JsonFileStore, MemoryStore, PersistenceStore};

use super::{build_engines, risk_manager, shutdown_signal, symbols_or_configured};
use crate::cli::{BacktestArgs, OutputFormat};

pub async fn run(args: BacktestArgs, config: &AppConfig) -> Result<()> {
    if !args.data.exists() {
        bail!(
            "Data path '{}' does not exist. Provide a CSV file or a directory of <SYMBOL>.csv files",
            args.data.display()
        );
    }

    let symbols = symbols_or_configured(&args.symbols, config);
    let data = load_symbols(&args.data, &symbols)
        .with_context(|| format!("Failed to load data from {}", args.data.display()))?;
    let total: usize = data.values().map(Vec::len).sum();
    info!(symbols = data.len(), bars = total, "Starting backtest");

    let store: Box<dyn PersistenceStore> = if args.persist {
        Box::new(
            JsonFileStore::open(&config.storage.dir)
                .await
                .with_context(|| format!("Failed to open storage at {}", config.storage.dir.display()))?,
        )
    } else {
        Box::new(MemoryStore::new())
    };

    let runner_config = RunnerConfig {
        snapshot_every_cycles: config.metrics.snapshot_every_cycles,
        periods_per_year: config.metrics.periods_per_year,
        flatten_at_end: !args.no_flatten,
        ..RunnerConfig::backtest()
    };
    let executor = PaperExecutor::new().with_slippage(config.paper.slippage_pct);

    let mut runner = Runner::new(
        runner_config,
        HistoricalBarSource::new(data),
        risk_manager(config),
        config.account.starting_equity,
        Box::new(executor),
        store,
    );
    for engine in build_engines(&symbols, config)? {
        runner = runner.with_engine(engine);
    }

    let outcome = runner.run(shutdown_signal()).await?;
    if outcome.cancelled {
        info!(cycles = outcome.cycles, "Backtest interrupted, report covers the bars replayed so far");
    }

    match args.output {
        OutputFormat::Json => println!("{}", outcome.report.to_json()?),
        OutputFormat::Text => println!("{}", outcome.report.summary()),
    }

    if let Some(path) = &args.save {
        save_report(&outcome.report, path)?;
    }

    Ok(())
}

/// Write the JSON report to `path` and the equity curve to `path` with a
/// `.equity.csv` extension.
fn save_report(report: &PerformanceReport, path: &Path) -> Result<()> {
    std::fs::write(path, report.to_json()?)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    let equity_path = path.with_extension("equity.csv");
    std::fs::write(&equity_path, report.equity_to_csv())
        .with_context(|| format!("Failed to write equity curve to {}", equity_path.display()))?;

    info!(report = %path.display(), equity = %equity_path.display(), "Results saved");
    Ok(())
}
