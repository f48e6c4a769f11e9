//! Market data provider trait.

use crate::error::DataError;
use crate::types::Bar;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Latest two-sided price for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub bid: f64,
    pub ask: f64,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl Tick {
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}

/// Source of completed bars and live prices.
///
/// Implementations return `DataError::Unavailable` while disconnected; the
/// runner treats that as transient and retries with backoff.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// The most recent `count` completed bars, oldest first.
    async fn latest_bars(&self, symbol: &str, count: usize) -> Result<Vec<Bar>, DataError>;

    async fn latest_tick(&self, symbol: &str) -> Result<Tick, DataError>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_mid_and_spread() {
        let tick = Tick {
            bid: 1.0999,
            ask: 1.1001,
            timestamp: 0,
        };

        assert!((tick.mid() - 1.1).abs() < 1e-9);
        assert!((tick.spread() - 0.0002).abs() < 1e-9);
    }
}
