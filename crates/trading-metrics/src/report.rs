//! Run report generation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use trading_core::types::TradeResult;

use crate::MetricsSnapshot;

/// Complete result of a run: metrics plus the closed-trade log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub mode: String,
    pub symbols: Vec<String>,
    pub starting_equity: Decimal,
    pub final_equity: Decimal,
    pub bars_processed: u64,
    pub metrics: MetricsSnapshot,
    pub trades: Vec<TradeResult>,
}

impl PerformanceReport {
    pub fn total_return_pct(&self) -> Decimal {
        if self.starting_equity > Decimal::ZERO {
            (self.final_equity - self.starting_equity) / self.starting_equity * dec!(100)
        } else {
            Decimal::ZERO
        }
    }

    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let m = &self.metrics;
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str(&format!("{:^59}\n", format!("{} REPORT", self.mode.to_uppercase())));
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str("PERFORMANCE\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Symbols:             {}\n", self.symbols.join(", ")));
        s.push_str(&format!("  Starting Equity:     {:.2}\n", self.starting_equity));
        s.push_str(&format!("  Final Equity:        {:.2}\n", self.final_equity));
        s.push_str(&format!("  Total Return:        {:.2}%\n", self.total_return_pct()));
        s.push_str(&format!("  Net PnL:             {:.2}\n", m.net_pnl));
        s.push_str(&format!(
            "  Max Drawdown:        {:.2} ({:.2}%)\n",
            m.max_drawdown,
            m.max_drawdown_pct * dec!(100)
        ));
        s.push('\n');

        s.push_str("RISK METRICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Sharpe Ratio:        {:.2}\n", m.sharpe_ratio));
        s.push_str(&format!("  Profit Factor:       {:.2}\n", m.profit_factor));
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Total Trades:        {}\n", m.trade_count));
        s.push_str(&format!("  Winning Trades:      {}\n", m.wins));
        s.push_str(&format!("  Losing Trades:       {}\n", m.losses));
        s.push_str(&format!("  Breakeven Trades:    {}\n", m.breakeven));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", m.win_rate * 100.0));
        if let Some(avg) = m.avg_win {
            s.push_str(&format!("  Avg Win:             {:.2}\n", avg));
        }
        if let Some(avg) = m.avg_loss {
            s.push_str(&format!("  Avg Loss:            {:.2}\n", avg));
        }
        s.push('\n');

        s.push_str("EXECUTION\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Bars Processed:      {}\n", self.bars_processed));
        s.push_str(&format!("  Equity Points:       {}\n", m.equity_curve.len()));
        s.push('\n');

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Equity curve as CSV.
    pub fn equity_to_csv(&self) -> String {
        let mut csv = String::from("timestamp,equity\n");
        for point in &self.metrics.equity_curve {
            csv.push_str(&format!("{},{}\n", point.timestamp, point.equity));
        }
        csv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetricsTracker;
    use trading_core::types::Side;

    fn report() -> PerformanceReport {
        let mut tracker = MetricsTracker::new(252.0);
        tracker.record_equity(1, dec!(10000));
        tracker.record_equity(2, dec!(11000));
        let trade = TradeResult {
            symbol: "EURUSD".into(),
            side: Side::Long,
            entry_price: dec!(1.1),
            exit_price: dec!(1.2),
            size: dec!(10000),
            pnl: dec!(1000),
            opened_at: 1,
            closed_at: 2,
        };
        tracker.record_trade(&trade);

        PerformanceReport {
            mode: "backtest".into(),
            symbols: vec!["EURUSD".into()],
            starting_equity: dec!(10000),
            final_equity: dec!(11000),
            bars_processed: 2,
            metrics: tracker.snapshot(),
            trades: vec![trade],
        }
    }

    #[test]
    fn test_report_summary() {
        let summary = report().summary();
        assert!(summary.contains("BACKTEST REPORT"));
        assert!(summary.contains("Total Return:        10.00%"));
        assert!(summary.contains("Profit Factor:       inf"));
        assert!(summary.contains("Sharpe Ratio:        n/a"));
    }

    #[test]
    fn test_exports() {
        let r = report();
        assert_eq!(r.equity_to_csv(), "timestamp,equity\n1,10000\n2,11000\n");

        let json: serde_json::Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();
        assert_eq!(json["metrics"]["profit_factor"], "infinite");
        assert_eq!(json["trades"].as_array().unwrap().len(), 1);
    }
}
