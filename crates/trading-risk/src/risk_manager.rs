//! Account-level risk gate.
//!
//! The manager holds only configuration. All running state lives in
//! [`AccountState`], which the caller owns and passes in per call.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, warn};
use trading_core::types::{Side, TradeResult};

use crate::{
    AccountState, DynamicFactors, DynamicSizingConfig, PositionSizer, RiskLimits, RiskScope,
    RiskViolation, SizingMultiplier,
};

/// Outcome of an entry check.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskDecision {
    Approved,
    Rejected {
        reason: RiskViolation,
        scope: RiskScope,
    },
}

impl RiskDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, RiskDecision::Approved)
    }

    fn reject(reason: RiskViolation, scope: RiskScope) -> Self {
        RiskDecision::Rejected { reason, scope }
    }
}

/// Stateless rules over limits and dynamic sizing configuration.
#[derive(Debug, Clone)]
pub struct RiskManager {
    limits: RiskLimits,
    sizer: PositionSizer,
}

impl RiskManager {
    pub fn new(limits: RiskLimits, sizing: DynamicSizingConfig) -> Self {
        Self {
            limits,
            sizer: PositionSizer::new(sizing),
        }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Decide whether `symbol` may open a new position. Fails closed:
    /// reaching a limit exactly is already a breach.
    pub fn approve_entry(&self, account: &AccountState, symbol: &str, side: Side) -> RiskDecision {
        let limits = &self.limits;

        if account.is_halted() {
            if let Some(session) = account.halted_session {
                return RiskDecision::reject(RiskViolation::SessionHalted { session }, RiskScope::Account);
            }
        }

        let loss = account.daily_loss();
        if loss >= limits.max_daily_loss {
            return RiskDecision::reject(
                RiskViolation::DailyLoss {
                    loss,
                    limit: limits.max_daily_loss,
                },
                RiskScope::Account,
            );
        }

        let drawdown_pct = account.drawdown_pct();
        if drawdown_pct >= limits.max_drawdown_pct {
            return RiskDecision::reject(
                RiskViolation::Drawdown {
                    drawdown_pct,
                    limit: limits.max_drawdown_pct,
                },
                RiskScope::Account,
            );
        }

        if let Some(limit) = limits.max_consecutive_losses {
            if account.loss_streak >= limit {
                return RiskDecision::reject(
                    RiskViolation::ConsecutiveLosses {
                        streak: account.loss_streak,
                        limit,
                    },
                    RiskScope::Account,
                );
            }
        }

        if let Some(limit) = limits.max_open_positions {
            if account.open_positions >= limit {
                return RiskDecision::reject(
                    RiskViolation::MaxOpenPositions {
                        open: account.open_positions,
                        limit,
                    },
                    RiskScope::Account,
                );
            }
        }

        if let Some(limit) = limits.max_symbol_daily_loss {
            let loss = account.symbol_daily_loss(symbol);
            if loss >= limit {
                return RiskDecision::reject(
                    RiskViolation::SymbolDailyLoss { loss, limit },
                    RiskScope::Symbol,
                );
            }
        }

        debug!(symbol, %side, equity = %account.equity, "Entry approved");
        RiskDecision::Approved
    }

    pub fn sizing_multiplier(&self, factors: &DynamicFactors) -> SizingMultiplier {
        self.sizer.multiplier(factors)
    }

    /// Units to trade: risk budget over stop distance, dynamic multiplier,
    /// notional cap, then truncation to the lot step.
    pub fn compute_size(
        &self,
        equity: Decimal,
        entry_price: Decimal,
        stop_price: Decimal,
        factors: &DynamicFactors,
    ) -> Decimal {
        let limits = &self.limits;
        let mut size = self.sizer.size(
            equity,
            limits.risk_per_trade_pct,
            entry_price,
            stop_price,
            factors,
            limits.lot_decimals,
        );

        if let Some(pct) = limits.max_position_pct {
            if entry_price > Decimal::ZERO {
                let cap = (equity * pct / entry_price)
                    .round_dp_with_strategy(limits.lot_decimals, RoundingStrategy::ToZero);
                if size > cap {
                    debug!(%size, %cap, "Size reduced by notional cap");
                    size = cap;
                }
            }
        }

        size
    }

    /// Roll the daily accumulators when `date` starts a new session.
    /// Returns true when a rollover happened.
    pub fn begin_session(&self, account: &mut AccountState, date: NaiveDate) -> bool {
        match account.session {
            Some(current) if current >= date => false,
            previous => {
                if previous.is_some() {
                    info!(
                        session = %date,
                        daily_pnl = %account.daily_realized_pnl,
                        "New session, resetting daily risk counters"
                    );
                }
                account.session = Some(date);
                account.daily_realized_pnl = Decimal::ZERO;
                account.symbol_daily_pnl.clear();
                account.halted_session = None;
                true
            }
        }
    }

    pub fn record_open(&self, account: &mut AccountState) {
        account.open_positions += 1;
    }

    /// Fold a closed trade into the account.
    pub fn record_outcome(&self, account: &mut AccountState, trade: &TradeResult) {
        if let Some(date) = trade.session_date() {
            self.begin_session(account, date);
        }

        account.open_positions = account.open_positions.saturating_sub(1);
        account.equity += trade.pnl;
        account.peak_equity = account.peak_equity.max(account.equity);
        account.daily_realized_pnl += trade.pnl;
        *account
            .symbol_daily_pnl
            .entry(trade.symbol.clone())
            .or_insert(Decimal::ZERO) += trade.pnl;

        // Loss streak spans sessions; any non-losing close ends it.
        if trade.is_loss() {
            account.loss_streak += 1;
            account.win_streak = 0;
        } else {
            account.loss_streak = 0;
            if trade.is_win() {
                account.win_streak += 1;
            }
        }

        if account.daily_loss() >= self.limits.max_daily_loss && !account.is_halted() {
            warn!(
                loss = %account.daily_loss(),
                limit = %self.limits.max_daily_loss,
                "Daily loss limit reached, halting entries for the session"
            );
            account.halted_session = account.session;
        }
    }
}
