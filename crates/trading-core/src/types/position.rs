//! Position lifecycle types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    /// +1 for long, -1 for short.
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Long => Decimal::ONE,
            Side::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// One trade from fill to exit.
///
/// The engine owns the open position for its symbol; `stop_price` may only
/// move toward profit while the position is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    /// Units, always positive
    pub size: Decimal,
    /// Current protective stop
    pub stop_price: Decimal,
    /// Stop at entry, kept for risk reporting
    pub initial_stop: Decimal,
    /// Entry bar open time, Unix ms
    pub opened_at: i64,
    pub status: PositionStatus,
    pub closed_at: Option<i64>,
    pub close_price: Option<Decimal>,
    pub realized_pnl: Option<Decimal>,
}

impl Position {
    pub fn open(
        id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        entry_price: Decimal,
        size: Decimal,
        stop_price: Decimal,
        opened_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            side,
            entry_price,
            size,
            stop_price,
            initial_stop: stop_price,
            opened_at,
            status: PositionStatus::Open,
            closed_at: None,
            close_price: None,
            realized_pnl: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Mark-to-market PnL at `price`.
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        (price - self.entry_price) * self.size * self.side.sign()
    }

    /// Amount lost if the current stop fills exactly.
    pub fn risk_at_stop(&self) -> Decimal {
        (self.entry_price - self.stop_price).abs() * self.size
    }

    /// Close the position at `price` and return the trade outcome.
    pub fn close(&mut self, price: Decimal, closed_at: i64) -> TradeResult {
        let pnl = self.unrealized_pnl(price);
        self.status = PositionStatus::Closed;
        self.closed_at = Some(closed_at);
        self.close_price = Some(price);
        self.realized_pnl = Some(pnl);

        TradeResult {
            symbol: self.symbol.clone(),
            side: self.side,
            entry_price: self.entry_price,
            exit_price: price,
            size: self.size,
            pnl,
            opened_at: self.opened_at,
            closed_at,
        }
    }
}

/// Outcome of a closed position, as consumed by risk and metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub size: Decimal,
    pub pnl: Decimal,
    pub opened_at: i64,
    pub closed_at: i64,
}

impl TradeResult {
    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < Decimal::ZERO
    }

    /// UTC date of the exit bar.
    pub fn session_date(&self) -> Option<NaiveDate> {
        DateTime::<Utc>::from_timestamp_millis(self.closed_at).map(|dt| dt.date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_long_close_pnl() {
        let mut pos = Position::open("EURUSD-1", "EURUSD", Side::Long, dec!(1.1000), dec!(20), dec!(1.0950), 0);
        assert_eq!(pos.risk_at_stop(), dec!(0.1000));

        let result = pos.close(dec!(1.1100), 60_000);
        assert_eq!(result.pnl, dec!(0.2000));
        assert!(result.is_win());
        assert!(!pos.is_open());
        assert_eq!(pos.realized_pnl, Some(dec!(0.2000)));
        assert_eq!(pos.close_price, Some(dec!(1.1100)));
    }

    #[test]
    fn test_short_close_pnl() {
        let mut pos = Position::open("GBPUSD-1", "GBPUSD", Side::Short, dec!(100), dec!(2), dec!(105), 0);
        assert_eq!(pos.unrealized_pnl(dec!(98)), dec!(4));

        let result = pos.close(dec!(103), 1);
        assert_eq!(result.pnl, dec!(-6));
        assert!(result.is_loss());
    }

    #[test]
    fn test_side_helpers() {
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert_eq!(Side::Short.sign(), dec!(-1));
        assert_eq!(Side::Long.to_string(), "LONG");
    }
}
