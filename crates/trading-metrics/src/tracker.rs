//! Incremental metrics tracker.

use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trading_core::types::TradeResult;

use crate::RunningStats;

/// A metric that may be infinite or undefined instead of a number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricValue<T> {
    Value(T),
    Infinite,
    Undefined,
}

impl<T: Copy> MetricValue<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            MetricValue::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl<T: std::fmt::Display> std::fmt::Display for MetricValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Value(v) => match f.precision() {
                Some(p) => write!(f, "{:.*}", p, v),
                None => write!(f, "{}", v),
            },
            MetricValue::Infinite => write!(f, "inf"),
            MetricValue::Undefined => write!(f, "n/a"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Unix ms
    pub timestamp: i64,
    pub equity: Decimal,
}

/// Point-in-time view of the tracked metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    /// Wins over all trades, 0 with no trades
    pub win_rate: f64,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub net_pnl: Decimal,
    pub avg_win: Option<Decimal>,
    pub avg_loss: Option<Decimal>,
    pub profit_factor: MetricValue<Decimal>,
    pub sharpe_ratio: MetricValue<f64>,
    /// Largest peak-to-trough fall, in account currency
    pub max_drawdown: Decimal,
    /// Same fall as a fraction of the peak it fell from
    pub max_drawdown_pct: Decimal,
    pub equity_curve: Vec<EquityPoint>,
}

/// Folds trade results and equity snapshots into running statistics.
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    periods_per_year: f64,
    wins: usize,
    losses: usize,
    breakeven: usize,
    gross_profit: Decimal,
    /// Absolute value of losing PnL
    gross_loss: Decimal,
    equity_curve: Vec<EquityPoint>,
    peak: Option<Decimal>,
    max_drawdown: Decimal,
    max_drawdown_pct: Decimal,
    returns: RunningStats,
}

impl MetricsTracker {
    pub fn new(periods_per_year: f64) -> Self {
        Self {
            periods_per_year,
            wins: 0,
            losses: 0,
            breakeven: 0,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            equity_curve: Vec::new(),
            peak: None,
            max_drawdown: Decimal::ZERO,
            max_drawdown_pct: Decimal::ZERO,
            returns: RunningStats::new(),
        }
    }

    pub fn trade_count(&self) -> usize {
        self.wins + self.losses + self.breakeven
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn last_equity(&self) -> Option<Decimal> {
        self.equity_curve.last().map(|p| p.equity)
    }

    pub fn record_trade(&mut self, trade: &TradeResult) {
        if trade.pnl > Decimal::ZERO {
            self.wins += 1;
            self.gross_profit += trade.pnl;
        } else if trade.pnl < Decimal::ZERO {
            self.losses += 1;
            self.gross_loss += trade.pnl.abs();
        } else {
            self.breakeven += 1;
        }
    }

    pub fn record_equity(&mut self, timestamp: i64, equity: Decimal) {
        if let Some(prev) = self.last_equity() {
            if let Some(ret) = period_return(prev, equity) {
                self.returns.push(ret);
            }
        }
        self.equity_curve.push(EquityPoint { timestamp, equity });

        let peak = match self.peak {
            Some(p) if p >= equity => p,
            _ => equity,
        };
        self.peak = Some(peak);

        let drawdown = peak - equity;
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
        if peak > Decimal::ZERO {
            let pct = drawdown / peak;
            if pct > self.max_drawdown_pct {
                self.max_drawdown_pct = pct;
            }
        }
    }

    pub fn sharpe_ratio(&self) -> MetricValue<f64> {
        sharpe(&self.returns, self.periods_per_year)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        build_snapshot(
            self.wins,
            self.losses,
            self.breakeven,
            self.gross_profit,
            self.gross_loss,
            self.sharpe_ratio(),
            self.max_drawdown,
            self.max_drawdown_pct,
            self.equity_curve.clone(),
        )
    }
}

fn period_return(prev: Decimal, equity: Decimal) -> Option<f64> {
    if prev <= Decimal::ZERO {
        return None;
    }
    ((equity - prev) / prev).to_f64()
}

fn sharpe(returns: &RunningStats, periods_per_year: f64) -> MetricValue<f64> {
    match (returns.mean(), returns.sample_std()) {
        (Some(mean), Some(std)) if std > 0.0 => {
            MetricValue::Value(mean / std * periods_per_year.sqrt())
        }
        _ => MetricValue::Undefined,
    }
}

#[allow(clippy::too_many_arguments)]
fn build_snapshot(
    wins: usize,
    losses: usize,
    breakeven: usize,
    gross_profit: Decimal,
    gross_loss: Decimal,
    sharpe_ratio: MetricValue<f64>,
    max_drawdown: Decimal,
    max_drawdown_pct: Decimal,
    equity_curve: Vec<EquityPoint>,
) -> MetricsSnapshot {
    let trade_count = wins + losses + breakeven;
    let win_rate = if trade_count > 0 {
        wins as f64 / trade_count as f64
    } else {
        0.0
    };

    let profit_factor = if gross_loss > Decimal::ZERO {
        MetricValue::Value(gross_profit / gross_loss)
    } else if gross_profit > Decimal::ZERO {
        MetricValue::Infinite
    } else {
        MetricValue::Undefined
    };

    MetricsSnapshot {
        trade_count,
        wins,
        losses,
        breakeven,
        win_rate,
        gross_profit,
        gross_loss,
        net_pnl: gross_profit - gross_loss,
        avg_win: (wins > 0).then(|| gross_profit / Decimal::from(wins)),
        avg_loss: (losses > 0).then(|| gross_loss / Decimal::from(losses)),
        profit_factor,
        sharpe_ratio,
        max_drawdown,
        max_drawdown_pct,
        equity_curve,
    }
}

/// Full-history computation over the same events the tracker consumes.
pub fn recompute(
    trades: &[TradeResult],
    equity_curve: &[EquityPoint],
    periods_per_year: f64,
) -> MetricsSnapshot {
    let wins = trades.iter().filter(|t| t.pnl > Decimal::ZERO).count();
    let losses = trades.iter().filter(|t| t.pnl < Decimal::ZERO).count();
    let breakeven = trades.len() - wins - losses;
    let gross_profit: Decimal = trades
        .iter()
        .filter(|t| t.pnl > Decimal::ZERO)
        .map(|t| t.pnl)
        .sum();
    let gross_loss: Decimal = trades
        .iter()
        .filter(|t| t.pnl < Decimal::ZERO)
        .map(|t| t.pnl.abs())
        .sum();

    let mut max_drawdown = Decimal::ZERO;
    let mut max_drawdown_pct = Decimal::ZERO;
    for (i, point) in equity_curve.iter().enumerate() {
        let peak = equity_curve[..=i]
            .iter()
            .map(|p| p.equity)
            .max()
            .unwrap_or(point.equity);
        max_drawdown = max_drawdown.max(peak - point.equity);
        if peak > Decimal::ZERO {
            max_drawdown_pct = max_drawdown_pct.max((peak - point.equity) / peak);
        }
    }

    let mut returns = RunningStats::new();
    for pair in equity_curve.windows(2) {
        if let Some(ret) = period_return(pair[0].equity, pair[1].equity) {
            returns.push(ret);
        }
    }

    build_snapshot(
        wins,
        losses,
        breakeven,
        gross_profit,
        gross_loss,
        sharpe(&returns, periods_per_year),
        max_drawdown,
        max_drawdown_pct,
        equity_curve.to_vec(),
    )
}
