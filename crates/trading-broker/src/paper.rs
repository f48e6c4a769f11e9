//! Paper executor for backtests and simulated sessions.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use tracing::debug;
use trading_core::error::ExecutionError;
use trading_core::traits::OrderExecutor;
use trading_core::types::{Position, Side};
use uuid::Uuid;

/// Fills retained for inspection; older ones are dropped first.
pub const MAX_FILL_LOG: usize = 1_000;

/// A simulated fill.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperFill {
    pub id: Uuid,
    pub symbol: String,
    /// Side of the order, not of the position: closing a long sells
    pub buy: bool,
    pub size: Decimal,
    pub price: Decimal,
}

/// Fills market orders at the last observed price, moved against the trader
/// by `slippage_pct` (a fraction, 0.0001 = 1bp).
#[derive(Debug, Default)]
pub struct PaperExecutor {
    prices: HashMap<String, Decimal>,
    slippage_pct: Decimal,
    fills: VecDeque<PaperFill>,
}

impl PaperExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slippage(mut self, slippage_pct: Decimal) -> Self {
        self.slippage_pct = slippage_pct;
        self
    }

    /// Most recent fills, oldest first, at most `MAX_FILL_LOG`.
    pub fn fills(&self) -> &VecDeque<PaperFill> {
        &self.fills
    }

    pub fn last_price(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).copied()
    }

    fn execute(&mut self, symbol: &str, buy: bool, size: Decimal) -> Result<Decimal, ExecutionError> {
        if size <= Decimal::ZERO {
            return Err(ExecutionError::InvalidSize {
                symbol: symbol.to_string(),
                size,
            });
        }
        let market = self
            .last_price(symbol)
            .ok_or_else(|| ExecutionError::NoPrice(symbol.to_string()))?;

        let price = if buy {
            market * (Decimal::ONE + self.slippage_pct)
        } else {
            market * (Decimal::ONE - self.slippage_pct)
        };

        let fill = PaperFill {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            buy,
            size,
            price,
        };
        debug!(id = %fill.id, symbol, buy, %size, %price, "Paper fill");
        if self.fills.len() == MAX_FILL_LOG {
            self.fills.pop_front();
        }
        self.fills.push_back(fill);

        Ok(price)
    }
}

#[async_trait]
impl OrderExecutor for PaperExecutor {
    async fn open_position(
        &mut self,
        symbol: &str,
        side: Side,
        size: Decimal,
    ) -> Result<Decimal, ExecutionError> {
        self.execute(symbol, side == Side::Long, size)
    }

    async fn close_position(&mut self, position: &Position) -> Result<Decimal, ExecutionError> {
        self.execute(&position.symbol, position.side == Side::Short, position.size)
    }

    fn on_market_price(&mut self, symbol: &str, price: Decimal) {
        self.prices.insert(symbol.to_string(), price);
    }

    fn name(&self) -> &str {
        "paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_fill_without_price_fails() {
        let mut executor = PaperExecutor::new();
        let err = executor.open_position("EURUSD", Side::Long, dec!(1)).await.unwrap_err();
        assert_eq!(err, ExecutionError::NoPrice("EURUSD".into()));
    }

    #[tokio::test]
    async fn test_slippage_is_adverse() {
        let mut executor = PaperExecutor::new().with_slippage(dec!(0.001));
        executor.on_market_price("EURUSD", dec!(100));

        let buy = executor.open_position("EURUSD", Side::Long, dec!(1)).await.unwrap();
        let sell = executor.open_position("EURUSD", Side::Short, dec!(1)).await.unwrap();
        assert_eq!(buy, dec!(100.1));
        assert_eq!(sell, dec!(99.9));

        let long = Position::open("EURUSD-1", "EURUSD", Side::Long, buy, dec!(1), dec!(99), 0);
        let exit = executor.close_position(&long).await.unwrap();
        assert_eq!(exit, dec!(99.9));
        assert_eq!(executor.fills().len(), 3);
        assert!(!executor.fills()[2].buy);
    }

    #[tokio::test]
    async fn test_fill_log_keeps_most_recent() {
        let mut executor = PaperExecutor::new();
        executor.on_market_price("EURUSD", dec!(100));
        for i in 0..MAX_FILL_LOG + 5 {
            executor
                .open_position("EURUSD", Side::Long, Decimal::from(i as u64 + 1))
                .await
                .unwrap();
        }
        assert_eq!(executor.fills().len(), MAX_FILL_LOG);
        assert_eq!(executor.fills().front().unwrap().size, dec!(6));
        assert_eq!(
            executor.fills().back().unwrap().size,
            Decimal::from(MAX_FILL_LOG as u64 + 5)
        );
    }

    #[tokio::test]
    async fn test_rejects_zero_size() {
        let mut executor = PaperExecutor::new();
        executor.on_market_price("EURUSD", dec!(1.1));
        assert!(matches!(
            executor.open_position("EURUSD", Side::Long, Decimal::ZERO).await,
            Err(ExecutionError::InvalidSize { .. })
        ));
    }
}
