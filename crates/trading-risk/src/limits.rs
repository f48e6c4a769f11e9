//! Account risk limits and the shared account accumulator.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Hard limits, fixed for a session. Percentages are fractions (0.01 = 1%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Realized loss per session, in account currency, that halts new entries
    pub max_daily_loss: Decimal,
    /// Drawdown from the equity peak that halts new entries
    pub max_drawdown_pct: Decimal,
    /// Equity fraction risked between entry and stop
    pub risk_per_trade_pct: Decimal,
    pub max_open_positions: Option<usize>,
    pub max_consecutive_losses: Option<u32>,
    /// Realized loss per symbol per session
    pub max_symbol_daily_loss: Option<Decimal>,
    /// Notional cap as a fraction of equity; only ever reduces size
    pub max_position_pct: Option<Decimal>,
    /// Sizes are truncated to this many decimals
    pub lot_decimals: u32,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_daily_loss: dec!(500),
            max_drawdown_pct: dec!(0.20),
            risk_per_trade_pct: dec!(0.01),
            max_open_positions: Some(3),
            max_consecutive_losses: Some(5),
            max_symbol_daily_loss: None,
            max_position_pct: None,
            lot_decimals: 2,
        }
    }
}

impl RiskLimits {
    /// Check internal consistency. Returns the offending field and reason.
    pub fn validate(&self) -> Result<(), (&'static str, String)> {
        if self.max_daily_loss <= Decimal::ZERO {
            return Err(("risk.max_daily_loss", "must be positive".into()));
        }
        if self.max_drawdown_pct <= Decimal::ZERO || self.max_drawdown_pct > Decimal::ONE {
            return Err(("risk.max_drawdown_pct", "must be in (0, 1]".into()));
        }
        if self.risk_per_trade_pct <= Decimal::ZERO || self.risk_per_trade_pct > Decimal::ONE {
            return Err(("risk.risk_per_trade_pct", "must be in (0, 1]".into()));
        }
        if self.max_open_positions == Some(0) {
            return Err(("risk.max_open_positions", "must be at least 1".into()));
        }
        if self.max_consecutive_losses == Some(0) {
            return Err(("risk.max_consecutive_losses", "must be at least 1".into()));
        }
        if let Some(limit) = self.max_symbol_daily_loss {
            if limit <= Decimal::ZERO {
                return Err(("risk.max_symbol_daily_loss", "must be positive".into()));
            }
        }
        if let Some(pct) = self.max_position_pct {
            if pct <= Decimal::ZERO {
                return Err(("risk.max_position_pct", "must be positive".into()));
            }
        }
        if self.lot_decimals > 10 {
            return Err(("risk.lot_decimals", "must be at most 10".into()));
        }
        Ok(())
    }
}

/// Why an entry was refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RiskViolation {
    /// Account already halted for the current session
    SessionHalted { session: NaiveDate },
    DailyLoss { loss: Decimal, limit: Decimal },
    Drawdown { drawdown_pct: Decimal, limit: Decimal },
    ConsecutiveLosses { streak: u32, limit: u32 },
    MaxOpenPositions { open: usize, limit: usize },
    SymbolDailyLoss { loss: Decimal, limit: Decimal },
    /// Sized position rounds to zero
    ZeroSize,
}

impl fmt::Display for RiskViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskViolation::SessionHalted { session } => {
                write!(f, "entries halted for session {}", session)
            }
            RiskViolation::DailyLoss { loss, limit } => {
                write!(f, "daily loss {} reached limit {}", loss, limit)
            }
            RiskViolation::Drawdown { drawdown_pct, limit } => write!(
                f,
                "drawdown {:.2}% reached limit {:.2}%",
                drawdown_pct * dec!(100),
                limit * dec!(100)
            ),
            RiskViolation::ConsecutiveLosses { streak, limit } => {
                write!(f, "{} consecutive losses (limit {})", streak, limit)
            }
            RiskViolation::MaxOpenPositions { open, limit } => {
                write!(f, "{} open positions (limit {})", open, limit)
            }
            RiskViolation::SymbolDailyLoss { loss, limit } => {
                write!(f, "symbol daily loss {} reached limit {}", loss, limit)
            }
            RiskViolation::ZeroSize => write!(f, "position size rounds to zero"),
        }
    }
}

/// Whether a rejection blocks one symbol or the whole account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskScope {
    Symbol,
    Account,
}

/// Running account accumulator shared by every engine.
///
/// `equity` is realized: starting equity plus closed-trade PnL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub equity: Decimal,
    pub peak_equity: Decimal,
    pub daily_realized_pnl: Decimal,
    pub symbol_daily_pnl: BTreeMap<String, Decimal>,
    pub session: Option<NaiveDate>,
    pub win_streak: u32,
    pub loss_streak: u32,
    /// Not persisted meaningfully across restarts; reset on load
    pub open_positions: usize,
    /// Session in which an account-level halt was latched
    pub halted_session: Option<NaiveDate>,
}

impl AccountState {
    pub fn new(starting_equity: Decimal) -> Self {
        Self {
            equity: starting_equity,
            peak_equity: starting_equity,
            daily_realized_pnl: Decimal::ZERO,
            symbol_daily_pnl: BTreeMap::new(),
            session: None,
            win_streak: 0,
            loss_streak: 0,
            open_positions: 0,
            halted_session: None,
        }
    }

    /// Realized loss this session as a positive number (0 when up).
    pub fn daily_loss(&self) -> Decimal {
        (-self.daily_realized_pnl).max(Decimal::ZERO)
    }

    pub fn symbol_daily_loss(&self, symbol: &str) -> Decimal {
        self.symbol_daily_pnl
            .get(symbol)
            .map(|pnl| (-*pnl).max(Decimal::ZERO))
            .unwrap_or(Decimal::ZERO)
    }

    /// Fractional drawdown of realized equity from its peak.
    pub fn drawdown_pct(&self) -> Decimal {
        if self.peak_equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        ((self.peak_equity - self.equity) / self.peak_equity).max(Decimal::ZERO)
    }

    pub fn is_halted(&self) -> bool {
        self.halted_session.is_some() && self.halted_session == self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_validate() {
        assert!(RiskLimits::default().validate().is_ok());

        let bad = RiskLimits {
            risk_per_trade_pct: dec!(1.5),
            ..Default::default()
        };
        assert_eq!(bad.validate().unwrap_err().0, "risk.risk_per_trade_pct");
    }

    #[test]
    fn test_account_derived_values() {
        let mut account = AccountState::new(dec!(10000));
        assert_eq!(account.drawdown_pct(), Decimal::ZERO);

        account.equity = dec!(9000);
        account.daily_realized_pnl = dec!(-1000);
        assert_eq!(account.drawdown_pct(), dec!(0.1));
        assert_eq!(account.daily_loss(), dec!(1000));
        assert_eq!(account.symbol_daily_loss("EURUSD"), Decimal::ZERO);
    }

    #[test]
    fn test_violation_display() {
        let v = RiskViolation::Drawdown {
            drawdown_pct: dec!(0.25),
            limit: dec!(0.2),
        };
        assert_eq!(v.to_string(), "drawdown 25.00% reached limit 20.00%");
    }
}
