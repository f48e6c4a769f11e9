//! Signal generator trait.

use crate::error::StrategyError;
use crate::types::{BarSeries, Signal};

/// Configuration validated once before a generator is built.
pub trait StrategyConfig: Send + Sync + Clone + 'static {
    fn validate(&self) -> Result<(), StrategyError>;
}

/// Produces a directional signal from the trailing window of one symbol.
///
/// Implementations are pure: the same window always yields the same signal.
/// The engine keeps the window; the generator only reads it.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Evaluate the newest bar of `series`. `bar_index` is the engine's
    /// running count of bars seen for the symbol, stamped on the signal.
    fn evaluate(&self, series: &BarSeries, bar_index: u64) -> Signal;

    /// Bars needed before a non-flat signal is possible.
    fn warmup_period(&self) -> usize;

    fn is_warmed_up(&self, bars_available: usize) -> bool {
        bars_available >= self.warmup_period()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timeframe;

    struct AlwaysFlat;

    impl Strategy for AlwaysFlat {
        fn name(&self) -> &str {
            "flat"
        }

        fn evaluate(&self, series: &BarSeries, bar_index: u64) -> Signal {
            let ts = series.last().map(|b| b.timestamp).unwrap_or_default();
            Signal::flat(series.symbol.clone(), bar_index, ts)
        }

        fn warmup_period(&self) -> usize {
            20
        }
    }

    #[test]
    fn test_strategy_warmup() {
        let strategy = AlwaysFlat;

        assert!(!strategy.is_warmed_up(19));
        assert!(strategy.is_warmed_up(20));
        let series = BarSeries::new("EURUSD", Timeframe::Minute5);
        assert!(strategy.evaluate(&series, 0).is_flat());
    }
}
