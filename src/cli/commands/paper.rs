//! Paper trading command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;
use trading_broker::PaperExecutor;
use trading_config::AppConfig;
use trading_core::types::RunMode;
use trading_data::{SimulatedMarketData, SimulationConfig};
use trading_engine::{FeedSettings, PollingBarSource, Runner, RunnerConfig};
use trading_store::JsonFileStore;

use super::{build_engines, risk_manager, shutdown_signal, symbols_or_configured};
use crate::cli::PaperArgs;

pub async fn run(args: PaperArgs, config: &AppConfig) -> Result<()> {
    let symbols = symbols_or_configured(&args.symbols, config);
    let timeframe = config.timeframe()?;

    // The walk starts far enough back for warmup to end at the current bar.
    let tf_ms = timeframe.as_millis();
    let now = Utc::now().timestamp_millis();
    let start_timestamp = now - now % tf_ms - config.warmup_bars as i64 * tf_ms;

    let feed = SimulatedMarketData::new(SimulationConfig {
        seed: config.paper.seed,
        start_price: config.paper.start_price,
        volatility: config.paper.volatility,
        timeframe,
        start_timestamp,
        ..Default::default()
    });
    let settings = FeedSettings {
        poll_interval: config.poll_interval(),
        timeout: config.feed.timeout(),
        initial_backoff: config.feed.initial_backoff(),
        max_backoff: config.feed.max_backoff(),
    };
    let source = PollingBarSource::new(feed, symbols.clone(), settings);

    let store = JsonFileStore::open(&config.storage.dir)
        .await
        .with_context(|| format!("Failed to open storage at {}", config.storage.dir.display()))?;

    let runner_config = RunnerConfig {
        mode: RunMode::Paper,
        warmup_bars: config.warmup_bars,
        snapshot_every_cycles: config.metrics.snapshot_every_cycles,
        periods_per_year: config.metrics.periods_per_year,
        flatten_at_end: false,
        restore_state: !args.fresh,
    };
    let executor = PaperExecutor::new().with_slippage(config.paper.slippage_pct);

    let mut runner = Runner::new(
        runner_config,
        source,
        risk_manager(config),
        config.account.starting_equity,
        Box::new(executor),
        Box::new(store),
    );
    for engine in build_engines(&symbols, config)? {
        runner = runner.with_engine(engine);
    }

    info!(
        session = %runner.monitor().id(),
        symbols = ?symbols,
        poll_s = config.poll_interval_seconds,
        storage = %config.storage.dir.display(),
        "Paper trading started, press Ctrl-C to stop"
    );
    let outcome = runner.run(shutdown_signal()).await?;

    println!("{}", outcome.report.summary());
    Ok(())
}
