//! The run loop.
//!
//! One cooperative loop drives every engine: fetch a cycle of bars, feed each
//! symbol's engine in symbol order, snapshot open equity, then wait for the
//! next poll. Cancellation is only observed between cycles.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};
use trading_core::error::{TradingError, TradingResult};
use trading_core::traits::OrderExecutor;
use trading_core::types::RunMode;
use trading_metrics::{MetricsTracker, PerformanceReport, DEFAULT_PERIODS_PER_YEAR};
use trading_monitor::{Heartbeat, SessionMonitor};
use trading_risk::{AccountState, RiskManager};
use trading_store::{PersistenceStore, RiskState};

use crate::engine::{CycleContext, EngineEvent, TradingEngine};
use crate::source::BarSource;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub mode: RunMode,
    /// History loaded into each engine before trading
    pub warmup_bars: usize,
    /// Heartbeat and metrics persistence interval, in cycles
    pub snapshot_every_cycles: u64,
    pub periods_per_year: f64,
    /// Close open positions once the source is exhausted
    pub flatten_at_end: bool,
    /// Continue from the stored account state
    pub restore_state: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Paper,
            warmup_bars: 200,
            snapshot_every_cycles: 5,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            flatten_at_end: true,
            restore_state: true,
        }
    }
}

impl RunnerConfig {
    /// Replay settings: no warmup, no restore, flatten at the end.
    pub fn backtest() -> Self {
        Self {
            mode: RunMode::Backtest,
            warmup_bars: 0,
            restore_state: false,
            ..Default::default()
        }
    }
}

/// What a finished run hands back.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: PerformanceReport,
    pub events: Vec<EngineEvent>,
    pub cycles: u64,
    /// Stopped by the shutdown signal rather than by running out of bars
    pub cancelled: bool,
    pub account: AccountState,
}

pub struct Runner<S> {
    config: RunnerConfig,
    source: S,
    engines: BTreeMap<String, TradingEngine>,
    risk: RiskManager,
    account: AccountState,
    metrics: MetricsTracker,
    executor: Box<dyn OrderExecutor>,
    store: Box<dyn PersistenceStore>,
    monitor: SessionMonitor,
    errors: u64,
}

impl<S: BarSource> Runner<S> {
    pub fn new(
        config: RunnerConfig,
        source: S,
        risk: RiskManager,
        starting_equity: Decimal,
        executor: Box<dyn OrderExecutor>,
        store: Box<dyn PersistenceStore>,
    ) -> Self {
        Self {
            metrics: MetricsTracker::new(config.periods_per_year),
            config,
            source,
            engines: BTreeMap::new(),
            risk,
            account: AccountState::new(starting_equity),
            executor,
            store,
            monitor: SessionMonitor::new(),
            errors: 0,
        }
    }

    pub fn with_engine(mut self, engine: TradingEngine) -> Self {
        self.engines.insert(engine.symbol().to_string(), engine);
        self
    }

    pub fn symbols(&self) -> Vec<String> {
        self.engines.keys().cloned().collect()
    }

    pub fn monitor(&self) -> &SessionMonitor {
        &self.monitor
    }

    /// Run until the source is exhausted or `shutdown` turns true.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> TradingResult<RunOutcome> {
        let span = info_span!("session", id = %self.monitor.id(), mode = %self.config.mode);
        self.run_inner(shutdown).instrument(span).await
    }

    async fn run_inner(mut self, mut shutdown: watch::Receiver<bool>) -> TradingResult<RunOutcome> {
        if self.engines.is_empty() {
            return Err(TradingError::Config("no symbols to trade".into()));
        }

        if self.config.restore_state {
            self.restore_state().await;
        }
        let starting_equity = self.account.equity;
        info!(
            symbols = ?self.symbols(),
            equity = %starting_equity,
            executor = self.executor.name(),
            "Session started"
        );
        self.warmup().await;

        let every = self.config.snapshot_every_cycles.max(1);
        let mut events = Vec::new();
        let mut cycles = 0u64;
        let mut bars_processed = 0u64;
        let mut last_timestamp = None;
        let mut cancelled = false;

        loop {
            if *shutdown.borrow() {
                info!(cycles, "Shutdown requested, stopping");
                cancelled = true;
                break;
            }
            let Some(cycle) = self.source.next_cycle().await else {
                debug!(cycles, "Bar source exhausted");
                break;
            };
            cycles += 1;

            let mut cycle_timestamp = None;
            for (symbol, result) in cycle {
                let bar = match result {
                    Ok(Some(bar)) => bar,
                    Ok(None) => continue,
                    Err(e) => {
                        self.errors += 1;
                        debug!(%symbol, error = %e, "No bar this cycle");
                        continue;
                    }
                };
                let Some(engine) = self.engines.get_mut(&symbol) else {
                    continue;
                };

                bars_processed += 1;
                let mut ctx = CycleContext {
                    account: &mut self.account,
                    risk: &self.risk,
                    metrics: &mut self.metrics,
                    executor: self.executor.as_mut(),
                    store: self.store.as_mut(),
                };
                match engine.on_bar(bar, &mut ctx).await {
                    Ok(mut bar_events) => {
                        cycle_timestamp = cycle_timestamp.max(Some(bar.timestamp));
                        events.append(&mut bar_events);
                    }
                    Err(e) => {
                        self.errors += 1;
                        warn!(%symbol, error = %e, "Bar rejected");
                    }
                }
            }

            if let Some(ts) = cycle_timestamp {
                let equity = self.open_equity();
                self.metrics.record_equity(ts, equity);
                last_timestamp = Some(ts);
            }

            if cycles % every == 0 {
                self.heartbeat(cycles);
                self.persist_metrics().await;
            }

            if let Some(interval) = self.source.poll_interval() {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            // Sender gone: nobody can cancel, keep the cadence.
                            tokio::time::sleep(interval).await;
                        }
                    }
                }
            }
        }

        if self.config.flatten_at_end && !cancelled {
            let exits = self.flatten().await;
            if !exits.is_empty() {
                if let Some(ts) = last_timestamp {
                    let equity = self.open_equity();
                    self.metrics.record_equity(ts, equity);
                }
            }
            events.extend(exits);
        }

        self.persist_metrics().await;
        self.save_state().await;

        let final_equity = self.open_equity();
        self.monitor.finish(cycles, self.metrics.trade_count(), final_equity);

        let trades = events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Exited { trade, .. } => Some(trade.clone()),
                _ => None,
            })
            .collect();
        let report = PerformanceReport {
            mode: self.config.mode.to_string(),
            symbols: self.symbols(),
            starting_equity,
            final_equity,
            bars_processed,
            metrics: self.metrics.snapshot(),
            trades,
        };

        Ok(RunOutcome {
            report,
            events,
            cycles,
            cancelled,
            account: self.account,
        })
    }

    /// Realized equity plus the mark-to-market of every open position.
    fn open_equity(&self) -> Decimal {
        self.account.equity + self.engines.values().map(TradingEngine::open_pnl).sum::<Decimal>()
    }

    async fn restore_state(&mut self) {
        match self.store.load_risk_state().await {
            Ok(Some(state)) => {
                if &state.limits != self.risk.limits() {
                    warn!("Stored risk limits differ from configuration, using configured limits");
                }
                self.account = state.account;
                // Positions do not survive a restart.
                self.account.open_positions = 0;
                info!(
                    equity = %self.account.equity,
                    peak = %self.account.peak_equity,
                    session = ?self.account.session,
                    "Risk state restored"
                );
            }
            Ok(None) => debug!("No stored risk state, starting fresh"),
            Err(e) => warn!(error = %e, "Could not load risk state, starting fresh"),
        }
    }

    async fn warmup(&mut self) {
        let count = self.config.warmup_bars;
        if count == 0 {
            return;
        }
        for (symbol, engine) in self.engines.iter_mut() {
            match self.source.warmup(symbol, count).await {
                Ok(bars) if bars.is_empty() => {}
                Ok(bars) => {
                    let accepted = engine.seed(bars);
                    info!(%symbol, bars = accepted, "Engine warmed up");
                }
                Err(e) => warn!(%symbol, error = %e, "Warmup failed, engine starts cold"),
            }
        }
    }

    async fn flatten(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        for engine in self.engines.values_mut() {
            let mut ctx = CycleContext {
                account: &mut self.account,
                risk: &self.risk,
                metrics: &mut self.metrics,
                executor: self.executor.as_mut(),
                store: self.store.as_mut(),
            };
            events.extend(engine.force_exit(&mut ctx).await);
        }
        events
    }

    fn heartbeat(&mut self, cycle: u64) {
        let beat = Heartbeat {
            cycle,
            symbols: self.engines.len(),
            open_positions: self.engines.values().filter(|e| e.position().is_some()).count(),
            equity: self.open_equity(),
            trades: self.metrics.trade_count(),
            errors: self.errors,
            halted: self.account.is_halted(),
        };
        self.monitor.heartbeat(&beat);
    }

    async fn persist_metrics(&mut self) {
        let snapshot = self.metrics.snapshot();
        if let Err(e) = self.store.record_metrics(&snapshot).await {
            error!(error = %e, "Failed to persist metrics snapshot");
        }
    }

    async fn save_state(&mut self) {
        let state = RiskState {
            limits: self.risk.limits().clone(),
            account: self.account.clone(),
        };
        if let Err(e) = self.store.save_risk_state(&state).await {
            error!(error = %e, "Failed to persist risk state");
        }
    }
}
