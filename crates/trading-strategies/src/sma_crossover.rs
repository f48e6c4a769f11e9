//! Simple moving average crossover signal generator.
//!
//! Emits `Long` on the bar where the fast SMA moves from at-or-below the slow
//! SMA to strictly above it, `Short` on the mirrored cross, and `Flat`
//! otherwise. A cross needs the previous bar's averages too, so nothing but
//! `Flat` is produced until `slow_period + 1` bars exist.

use serde::{Deserialize, Serialize};
use trading_core::{
    error::StrategyError,
    traits::{Strategy, StrategyConfig},
    types::{BarSeries, Direction, Signal},
};
use trading_indicators::Sma;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverConfig {
    pub fast_period: usize,
    pub slow_period: usize,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            fast_period: 10,
            slow_period: 30,
        }
    }
}

impl StrategyConfig for CrossoverConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.fast_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be greater than 0".into(),
            ));
        }
        if self.fast_period >= self.slow_period {
            return Err(StrategyError::InvalidConfig(format!(
                "Fast period ({}) must be less than slow period ({})",
                self.fast_period, self.slow_period
            )));
        }
        Ok(())
    }
}

/// Fast/slow SMA crossover over bar closes.
#[derive(Debug, Clone)]
pub struct SmaCrossover {
    config: CrossoverConfig,
    fast: Sma,
    slow: Sma,
}

impl SmaCrossover {
    pub fn new(config: CrossoverConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        let fast = Sma::new(config.fast_period)
            .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;
        let slow = Sma::new(config.slow_period)
            .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;
        Ok(Self { config, fast, slow })
    }

    pub fn config(&self) -> &CrossoverConfig {
        &self.config
    }

    /// Classify a crossover from the previous and current averages.
    fn classify(prev_fast: f64, prev_slow: f64, fast: f64, slow: f64) -> Direction {
        if prev_fast <= prev_slow && fast > slow {
            Direction::Long
        } else if prev_fast >= prev_slow && fast < slow {
            Direction::Short
        } else {
            Direction::Flat
        }
    }
}

impl Strategy for SmaCrossover {
    fn name(&self) -> &str {
        "SMA Crossover"
    }

    fn evaluate(&self, series: &BarSeries, bar_index: u64) -> Signal {
        let timestamp = series.last().map(|b| b.timestamp).unwrap_or_default();
        let mut signal = Signal::flat(series.symbol.clone(), bar_index, timestamp);

        // only the trailing slow_period + 1 closes matter
        let closes = series.last_closes(self.warmup_period());
        let (Some(fast), Some(slow)) = (self.fast.at_offset(&closes, 0), self.slow.at_offset(&closes, 0))
        else {
            return signal;
        };
        signal.fast = Some(fast);
        signal.slow = Some(slow);

        let (Some(prev_fast), Some(prev_slow)) =
            (self.fast.at_offset(&closes, 1), self.slow.at_offset(&closes, 1))
        else {
            return signal;
        };

        signal.direction = Self::classify(prev_fast, prev_slow, fast, slow);
        if !signal.is_flat() && slow != 0.0 {
            signal.strength = Some(((fast - slow) / slow).abs());
        }
        signal
    }

    fn warmup_period(&self) -> usize {
        self.config.slow_period + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_core::types::{Bar, Timeframe};

    fn run(closes: &[f64], fast: usize, slow: usize) -> Vec<Signal> {
        let generator = SmaCrossover::new(CrossoverConfig {
            fast_period: fast,
            slow_period: slow,
        })
        .unwrap();

        let mut series = BarSeries::new("TEST", Timeframe::Minute5);
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                series.push(Bar::flat(i as i64 * 300_000, close));
                generator.evaluate(&series, i as u64)
            })
            .collect()
    }

    #[test]
    fn test_config_validation() {
        assert!(CrossoverConfig::default().validate().is_ok());

        let inverted = CrossoverConfig {
            fast_period: 30,
            slow_period: 20,
        };
        assert!(inverted.validate().is_err());

        let equal = CrossoverConfig {
            fast_period: 5,
            slow_period: 5,
        };
        assert!(SmaCrossover::new(equal).is_err());

        let zero = CrossoverConfig {
            fast_period: 0,
            slow_period: 5,
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_crossover_scenario() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let signals = run(&closes, 3, 5);

        let non_flat: Vec<(u64, Direction)> = signals
            .iter()
            .filter(|s| !s.is_flat())
            .map(|s| (s.bar_index, s.direction))
            .collect();

        assert_eq!(non_flat, vec![(7, Direction::Short), (11, Direction::Long)]);
        assert!(signals[..5].iter().all(|s| s.is_flat()));
    }

    #[test]
    fn test_flat_without_previous_slow_average() {
        // exactly slow_period bars: current averages exist, previous slow does not
        let signals = run(&[5.0, 4.0, 3.0, 2.0, 10.0], 2, 5);
        let last = signals.last().unwrap();

        assert!(last.is_flat());
        assert!(last.slow.is_some());
        assert!(last.strength.is_none());
    }

    #[test]
    fn test_signal_is_pure_function_of_window() {
        let generator = SmaCrossover::new(CrossoverConfig {
            fast_period: 2,
            slow_period: 3,
        })
        .unwrap();

        let mut series = BarSeries::new("TEST", Timeframe::Minute5);
        for (i, close) in [3.0, 2.0, 1.0, 4.0].iter().enumerate() {
            series.push(Bar::flat(i as i64, *close));
        }

        let first = generator.evaluate(&series, 3);
        let second = generator.evaluate(&series, 3);
        assert_eq!(first, second);
        assert_eq!(first.direction, Direction::Long);
        assert!(first.strength.unwrap() > 0.0);
    }

    #[test]
    fn test_touching_then_crossing_counts() {
        // prev fast == prev slow, then fast above: still a long cross
        let signals = run(&[1.0, 1.0, 1.0, 1.0, 2.0], 2, 4);
        assert_eq!(signals[4].direction, Direction::Long);
    }
}
