//! Per-symbol trading state machine.
//!
//! `Flat -> Evaluating -> PositionOpen -> Closing -> Flat`. An engine owns
//! the bar window and the open position for one symbol; the account
//! accumulator and every collaborator arrive through [`CycleContext`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, warn};
use trading_core::error::{TradingError, TradingResult};
use trading_core::traits::{OrderExecutor, Strategy};
use trading_core::types::{Bar, BarSeries, Position, Side, Timeframe, TradeResult};
use trading_indicators::realized_volatility;
use trading_metrics::MetricsTracker;
use trading_risk::{
    AccountState, DynamicFactors, RiskDecision, RiskManager, RiskScope, RiskViolation,
    StopUpdate, TrailingStopManager,
};
use trading_store::PersistenceStore;

/// Bars retained per symbol, unless the strategy or stops need a longer window.
const SERIES_CAPACITY: usize = 1_000;
const DEFAULT_VOLATILITY_LOOKBACK: usize = 20;

/// Window that keeps every lookback satisfiable.
fn window_capacity(strategy: &dyn Strategy, stops: &TrailingStopManager, volatility_lookback: usize) -> usize {
    SERIES_CAPACITY
        .max(strategy.warmup_period())
        .max(stops.config().atr_period + 1)
        .max(volatility_lookback + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Flat,
    /// Entry approved by the signal, being checked and filled
    Evaluating,
    PositionOpen,
    /// Exit decided; stays here until the close is filled
    Closing,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Flat => write!(f, "flat"),
            EngineState::Evaluating => write!(f, "evaluating"),
            EngineState::PositionOpen => write!(f, "position_open"),
            EngineState::Closing => write!(f, "closing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopTriggered,
    OpposingSignal,
    /// Flattened when a backtest ran out of bars
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopTriggered => write!(f, "stop_triggered"),
            ExitReason::OpposingSignal => write!(f, "opposing_signal"),
            ExitReason::EndOfData => write!(f, "end_of_data"),
        }
    }
}

/// Something an engine did on a bar. The ordered list of events is the
/// observable log of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Entered {
        symbol: String,
        timestamp: i64,
        side: Side,
        price: Decimal,
        size: Decimal,
        stop: Decimal,
    },
    EntryRejected {
        symbol: String,
        timestamp: i64,
        side: Side,
        reason: RiskViolation,
    },
    EntryFailed {
        symbol: String,
        timestamp: i64,
        side: Side,
        error: String,
    },
    StopAdjusted {
        symbol: String,
        timestamp: i64,
        from: Decimal,
        to: Decimal,
    },
    Exited {
        symbol: String,
        timestamp: i64,
        reason: ExitReason,
        trade: TradeResult,
    },
    ExitFailed {
        symbol: String,
        timestamp: i64,
        reason: ExitReason,
        error: String,
    },
}

impl EngineEvent {
    pub fn symbol(&self) -> &str {
        match self {
            EngineEvent::Entered { symbol, .. }
            | EngineEvent::EntryRejected { symbol, .. }
            | EngineEvent::EntryFailed { symbol, .. }
            | EngineEvent::StopAdjusted { symbol, .. }
            | EngineEvent::Exited { symbol, .. }
            | EngineEvent::ExitFailed { symbol, .. } => symbol,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            EngineEvent::Entered { timestamp, .. }
            | EngineEvent::EntryRejected { timestamp, .. }
            | EngineEvent::EntryFailed { timestamp, .. }
            | EngineEvent::StopAdjusted { timestamp, .. }
            | EngineEvent::Exited { timestamp, .. }
            | EngineEvent::ExitFailed { timestamp, .. } => *timestamp,
        }
    }
}

/// Everything an engine touches outside its own symbol for one bar.
pub struct CycleContext<'a> {
    pub account: &'a mut AccountState,
    pub risk: &'a RiskManager,
    pub metrics: &'a mut MetricsTracker,
    pub executor: &'a mut dyn OrderExecutor,
    pub store: &'a mut dyn PersistenceStore,
}

pub struct TradingEngine {
    symbol: String,
    strategy: Box<dyn Strategy>,
    stops: TrailingStopManager,
    volatility_lookback: usize,
    series: BarSeries,
    state: EngineState,
    position: Option<Position>,
    pending_exit: Option<ExitReason>,
    bars_seen: u64,
    /// Symbol-scoped risk rejection latched for a session
    symbol_halt: Option<(NaiveDate, RiskViolation)>,
    trade_seq: u64,
}

impl TradingEngine {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        strategy: Box<dyn Strategy>,
        stops: TrailingStopManager,
    ) -> Self {
        let symbol = symbol.into();
        let capacity = window_capacity(strategy.as_ref(), &stops, DEFAULT_VOLATILITY_LOOKBACK);
        Self {
            series: BarSeries::with_capacity(symbol.clone(), timeframe, capacity),
            symbol,
            strategy,
            stops,
            volatility_lookback: DEFAULT_VOLATILITY_LOOKBACK,
            state: EngineState::Flat,
            position: None,
            pending_exit: None,
            bars_seen: 0,
            symbol_halt: None,
            trade_seq: 0,
        }
    }

    /// Returns used for the realized-volatility sizing factor.
    pub fn with_volatility_lookback(mut self, lookback: usize) -> Self {
        self.volatility_lookback = lookback;
        let capacity = window_capacity(self.strategy.as_ref(), &self.stops, lookback);
        if capacity != self.series.capacity() {
            let mut series = BarSeries::with_capacity(self.symbol.clone(), self.series.timeframe, capacity);
            series.extend(self.series.iter().copied());
            self.series = series;
        }
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn series(&self) -> &BarSeries {
        &self.series
    }

    /// Bars accepted so far, warmup included.
    pub fn bars_seen(&self) -> u64 {
        self.bars_seen
    }

    /// Mark-to-market PnL of the open position at the last close.
    pub fn open_pnl(&self) -> Decimal {
        let price = self.series.last().and_then(|b| b.close_decimal());
        match (&self.position, price) {
            (Some(position), Some(price)) => position.unrealized_pnl(price),
            _ => Decimal::ZERO,
        }
    }

    /// Load history without trading on it. Bars not strictly after the
    /// newest known bar are skipped. Returns the number accepted.
    pub fn seed(&mut self, bars: impl IntoIterator<Item = Bar>) -> usize {
        let mut accepted = 0;
        for bar in bars {
            if self.series.last().is_some_and(|last| bar.timestamp <= last.timestamp) {
                continue;
            }
            self.series.push(bar);
            self.bars_seen += 1;
            accepted += 1;
        }
        debug!(symbol = %self.symbol, accepted, "Warmup bars loaded");
        if !self.strategy.is_warmed_up(self.series.len()) {
            warn!(
                symbol = %self.symbol,
                bars = self.series.len(),
                needed = self.strategy.warmup_period(),
                "Warmup shorter than the strategy window, first signals will be late"
            );
        }
        accepted
    }

    /// Advance the state machine by one closed bar.
    pub async fn on_bar(
        &mut self,
        bar: Bar,
        ctx: &mut CycleContext<'_>,
    ) -> TradingResult<Vec<EngineEvent>> {
        if let Some(last) = self.series.last() {
            if bar.timestamp <= last.timestamp {
                warn!(
                    symbol = %self.symbol,
                    timestamp = bar.timestamp,
                    last = last.timestamp,
                    "Out-of-order bar rejected"
                );
                return Err(TradingError::OutOfOrderBar {
                    symbol: self.symbol.clone(),
                    timestamp: bar.timestamp,
                    last: last.timestamp,
                });
            }
        }
        let price = bar.close_decimal().ok_or_else(|| {
            TradingError::Validation(format!("{}: close {} is not a price", self.symbol, bar.close))
        })?;

        if let Some(date) = bar.session_date() {
            ctx.risk.begin_session(ctx.account, date);
            if matches!(&self.symbol_halt, Some((halted, _)) if *halted < date) {
                debug!(symbol = %self.symbol, session = %date, "Symbol entry halt lifted");
                self.symbol_halt = None;
            }
        }

        self.series.push(bar);
        let bar_index = self.bars_seen;
        self.bars_seen += 1;
        ctx.executor.on_market_price(&self.symbol, price);

        let signal = self.strategy.evaluate(&self.series, bar_index);
        let mut events = Vec::new();

        if let Some(position) = self.position.as_mut() {
            match self.stops.update(position, &self.series) {
                StopUpdate::Triggered { stop } => {
                    if self.pending_exit.is_none() {
                        info!(symbol = %self.symbol, %stop, close = %price, "Trailing stop triggered");
                    }
                    self.pending_exit.get_or_insert(ExitReason::StopTriggered);
                }
                StopUpdate::Tightened { from, to } => {
                    debug!(symbol = %self.symbol, %from, %to, "Stop tightened");
                    events.push(EngineEvent::StopAdjusted {
                        symbol: self.symbol.clone(),
                        timestamp: bar.timestamp,
                        from,
                        to,
                    });
                }
                StopUpdate::Unchanged => {}
            }

            if self.pending_exit.is_none() && signal.direction.opposes(position.side) {
                info!(symbol = %self.symbol, side = %position.side, "Opposing signal, exiting");
                self.pending_exit = Some(ExitReason::OpposingSignal);
            }

            if let Some(reason) = self.pending_exit {
                self.state = EngineState::Closing;
                self.try_exit(reason, bar.timestamp, ctx, &mut events).await;
            }
            return Ok(events);
        }

        if let Some(side) = signal.direction.side() {
            self.state = EngineState::Evaluating;
            if let Some(event) = self.enter(side, price, bar.timestamp, ctx).await {
                events.push(event);
            }
            self.state = if self.position.is_some() {
                EngineState::PositionOpen
            } else {
                EngineState::Flat
            };
        }

        Ok(events)
    }

    /// Close any open position at the last known price.
    pub async fn force_exit(&mut self, ctx: &mut CycleContext<'_>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if self.position.is_none() {
            return events;
        }

        let timestamp = self.series.last().map(|b| b.timestamp).unwrap_or_default();
        let reason = ExitReason::EndOfData;
        self.pending_exit = Some(reason);
        self.state = EngineState::Closing;
        self.try_exit(reason, timestamp, ctx, &mut events).await;
        events
    }

    async fn enter(
        &mut self,
        side: Side,
        price: Decimal,
        timestamp: i64,
        ctx: &mut CycleContext<'_>,
    ) -> Option<EngineEvent> {
        if let Some((session, reason)) = &self.symbol_halt {
            debug!(symbol = %self.symbol, %session, "Entries halted for symbol");
            return Some(EngineEvent::EntryRejected {
                symbol: self.symbol.clone(),
                timestamp,
                side,
                reason: reason.clone(),
            });
        }

        if let RiskDecision::Rejected { reason, scope } =
            ctx.risk.approve_entry(ctx.account, &self.symbol, side)
        {
            info!(symbol = %self.symbol, %side, %reason, ?scope, "Entry rejected by risk");
            if scope == RiskScope::Symbol {
                if let Some(session) = ctx.account.session {
                    self.symbol_halt = Some((session, reason.clone()));
                }
            }
            return Some(EngineEvent::EntryRejected {
                symbol: self.symbol.clone(),
                timestamp,
                side,
                reason,
            });
        }

        let Some(stop) = self.stops.initial_stop(price, side, &self.series) else {
            debug!(symbol = %self.symbol, "No stop distance yet, entry skipped");
            return None;
        };

        let closes = self.series.last_closes(self.volatility_lookback + 1);
        let factors = DynamicFactors {
            realized_volatility: realized_volatility(&closes, self.volatility_lookback),
            win_streak: ctx.account.win_streak,
        };
        let multiplier = ctx.risk.sizing_multiplier(&factors);
        debug!(
            symbol = %self.symbol,
            volatility = %multiplier.volatility,
            win_streak = %multiplier.win_streak,
            combined = %multiplier.combined,
            "Sizing multiplier"
        );
        let size = ctx.risk.compute_size(ctx.account.equity, price, stop, &factors);
        if size <= Decimal::ZERO {
            info!(symbol = %self.symbol, %side, %price, %stop, "Sized position is zero, entry skipped");
            return Some(EngineEvent::EntryRejected {
                symbol: self.symbol.clone(),
                timestamp,
                side,
                reason: RiskViolation::ZeroSize,
            });
        }

        let fill = match ctx.executor.open_position(&self.symbol, side, size).await {
            Ok(fill) => fill,
            Err(e) => {
                warn!(symbol = %self.symbol, %side, %size, error = %e, "Entry order failed");
                return Some(EngineEvent::EntryFailed {
                    symbol: self.symbol.clone(),
                    timestamp,
                    side,
                    error: e.to_string(),
                });
            }
        };

        // Keep the sized distance from the actual fill.
        let stop = fill - (price - stop).abs() * side.sign();

        self.trade_seq += 1;
        let position = Position::open(
            format!("{}-{}", self.symbol, self.trade_seq),
            &self.symbol,
            side,
            fill,
            size,
            stop,
            timestamp,
        );
        ctx.risk.record_open(ctx.account);
        info!(
            symbol = %self.symbol,
            id = %position.id,
            %side,
            price = %fill,
            %size,
            %stop,
            "Position opened"
        );
        self.position = Some(position);

        Some(EngineEvent::Entered {
            symbol: self.symbol.clone(),
            timestamp,
            side,
            price: fill,
            size,
            stop,
        })
    }

    async fn try_exit(
        &mut self,
        reason: ExitReason,
        timestamp: i64,
        ctx: &mut CycleContext<'_>,
        events: &mut Vec<EngineEvent>,
    ) {
        let Some(position) = self.position.as_mut() else {
            self.pending_exit = None;
            self.state = EngineState::Flat;
            return;
        };

        let fill = match ctx.executor.close_position(position).await {
            Ok(fill) => fill,
            Err(e) => {
                warn!(
                    symbol = %self.symbol,
                    id = %position.id,
                    %reason,
                    error = %e,
                    "Exit order failed, retrying next bar"
                );
                events.push(EngineEvent::ExitFailed {
                    symbol: self.symbol.clone(),
                    timestamp,
                    reason,
                    error: e.to_string(),
                });
                return;
            }
        };

        let trade = position.close(fill, timestamp);
        ctx.risk.record_outcome(ctx.account, &trade);
        ctx.metrics.record_trade(&trade);
        if let Err(e) = ctx.store.record_trade(position).await {
            error!(symbol = %self.symbol, id = %position.id, error = %e, "Failed to persist closed position");
        }

        info!(
            symbol = %self.symbol,
            id = %position.id,
            %reason,
            price = %fill,
            pnl = %trade.pnl,
            equity = %ctx.account.equity,
            "Position closed"
        );
        events.push(EngineEvent::Exited {
            symbol: self.symbol.clone(),
            timestamp,
            reason,
            trade,
        });

        self.position = None;
        self.pending_exit = None;
        self.state = EngineState::Flat;
    }
}
