//! Trailing stop management.
//!
//! A stop only ever moves toward profit: up for longs, down for shorts.
//! Trigger checks run against the stop as it stood before the bar, so a bar
//! that both crosses the stop and would ratchet it is an exit.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use trading_core::types::{BarSeries, Position, Side};
use trading_indicators::Atr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMode {
    /// `distance_value` in price units
    #[default]
    Fixed,
    /// `distance_value` multiples of ATR(`atr_period`)
    Atr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailingStopConfig {
    /// When false the initial stop is kept for the life of the position
    pub enabled: bool,
    pub distance_mode: DistanceMode,
    pub distance_value: Decimal,
    pub atr_period: usize,
    /// Smallest improvement worth moving the stop for
    pub min_step: Decimal,
}

impl Default for TrailingStopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            distance_mode: DistanceMode::Fixed,
            distance_value: dec!(0.0020),
            atr_period: 14,
            min_step: Decimal::ZERO,
        }
    }
}

impl TrailingStopConfig {
    pub fn validate(&self) -> Result<(), (&'static str, String)> {
        if self.distance_value <= Decimal::ZERO {
            return Err(("trailing_stop.distance_value", "must be positive".into()));
        }
        if self.distance_mode == DistanceMode::Atr && self.atr_period == 0 {
            return Err(("trailing_stop.atr_period", "must be at least 1".into()));
        }
        if self.min_step < Decimal::ZERO {
            return Err(("trailing_stop.min_step", "must not be negative".into()));
        }
        Ok(())
    }
}

/// What happened to a position's stop on one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopUpdate {
    Unchanged,
    Tightened { from: Decimal, to: Decimal },
    /// The close crossed the existing stop against the position
    Triggered { stop: Decimal },
}

#[derive(Debug, Clone)]
pub struct TrailingStopManager {
    config: TrailingStopConfig,
    atr: Option<Atr>,
}

impl TrailingStopManager {
    pub fn new(config: TrailingStopConfig) -> Self {
        let atr = match config.distance_mode {
            DistanceMode::Atr => Atr::new(config.atr_period).ok(),
            DistanceMode::Fixed => None,
        };
        Self { config, atr }
    }

    pub fn config(&self) -> &TrailingStopConfig {
        &self.config
    }

    /// Current trailing distance, `None` while ATR lacks history.
    pub fn distance(&self, series: &BarSeries) -> Option<Decimal> {
        match self.config.distance_mode {
            DistanceMode::Fixed => Some(self.config.distance_value),
            DistanceMode::Atr => {
                let atr = self.atr.as_ref()?.latest_for(series)?;
                let atr = Decimal::try_from(atr).ok()?;
                let distance = atr * self.config.distance_value;
                (distance > Decimal::ZERO).then_some(distance)
            }
        }
    }

    /// Protective stop for a new position entered at `entry`.
    pub fn initial_stop(&self, entry: Decimal, side: Side, series: &BarSeries) -> Option<Decimal> {
        let distance = self.distance(series)?;
        Some(entry - distance * side.sign())
    }

    pub fn is_triggered(stop: Decimal, close: Decimal, side: Side) -> bool {
        match side {
            Side::Long => close <= stop,
            Side::Short => close >= stop,
        }
    }

    /// Check the stop against the newest bar, then ratchet it.
    pub fn update(&self, position: &mut Position, series: &BarSeries) -> StopUpdate {
        let Some(close) = series.last().and_then(|b| b.close_decimal()) else {
            return StopUpdate::Unchanged;
        };

        let current = position.stop_price;
        if Self::is_triggered(current, close, position.side) {
            return StopUpdate::Triggered { stop: current };
        }

        if !self.config.enabled {
            return StopUpdate::Unchanged;
        }
        let Some(distance) = self.distance(series) else {
            return StopUpdate::Unchanged;
        };

        let candidate = close - distance * position.side.sign();
        let improvement = match position.side {
            Side::Long => candidate - current,
            Side::Short => current - candidate,
        };

        if improvement > Decimal::ZERO && improvement >= self.config.min_step {
            position.stop_price = candidate;
            StopUpdate::Tightened {
                from: current,
                to: candidate,
            }
        } else {
            StopUpdate::Unchanged
        }
    }
}
