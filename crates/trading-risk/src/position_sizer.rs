//! Risk-based position sizing with optional dynamic multipliers.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Clamp bounds for the dynamic sizing factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingBounds {
    pub volatility_min: Decimal,
    pub volatility_max: Decimal,
    /// Added to the win-streak factor per consecutive win
    pub win_streak_step: Decimal,
    /// Wins needed before the bonus applies
    pub win_streak_min: u32,
    pub win_streak_max: Decimal,
    pub total_min: Decimal,
    pub total_max: Decimal,
}

impl Default for SizingBounds {
    fn default() -> Self {
        Self {
            volatility_min: dec!(0.5),
            volatility_max: dec!(1.5),
            win_streak_step: dec!(0.1),
            win_streak_min: 1,
            win_streak_max: dec!(1.5),
            total_min: dec!(0.25),
            total_max: dec!(2.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicSizingConfig {
    pub enabled: bool,
    pub volatility_adjustment: bool,
    pub win_streak_bonus: bool,
    pub bounds: SizingBounds,
    /// Per-bar return volatility that maps to a factor of 1.0
    pub volatility_target: f64,
    /// Returns used to estimate realized volatility
    pub volatility_lookback: usize,
}

impl Default for DynamicSizingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            volatility_adjustment: true,
            win_streak_bonus: true,
            bounds: SizingBounds::default(),
            volatility_target: 0.001,
            volatility_lookback: 20,
        }
    }
}

impl DynamicSizingConfig {
    pub fn validate(&self) -> Result<(), (&'static str, String)> {
        let b = &self.bounds;
        if b.volatility_min <= Decimal::ZERO || b.volatility_min > b.volatility_max {
            return Err((
                "dynamic_sizing.bounds.volatility_min",
                "must be positive and not above volatility_max".into(),
            ));
        }
        if b.win_streak_step < Decimal::ZERO {
            return Err(("dynamic_sizing.bounds.win_streak_step", "must not be negative".into()));
        }
        if b.win_streak_max < Decimal::ONE {
            return Err(("dynamic_sizing.bounds.win_streak_max", "must be at least 1".into()));
        }
        if b.total_min <= Decimal::ZERO || b.total_min > b.total_max {
            return Err((
                "dynamic_sizing.bounds.total_min",
                "must be positive and not above total_max".into(),
            ));
        }
        if !(self.volatility_target > 0.0) {
            return Err(("dynamic_sizing.volatility_target", "must be positive".into()));
        }
        if self.volatility_lookback < 2 {
            return Err(("dynamic_sizing.volatility_lookback", "must be at least 2".into()));
        }
        Ok(())
    }
}

/// Inputs observed by the engine at entry time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DynamicFactors {
    pub realized_volatility: Option<f64>,
    pub win_streak: u32,
}

/// The individual and combined dynamic multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingMultiplier {
    pub volatility: Decimal,
    pub win_streak: Decimal,
    pub combined: Decimal,
}

impl SizingMultiplier {
    pub const NEUTRAL: SizingMultiplier = SizingMultiplier {
        volatility: Decimal::ONE,
        win_streak: Decimal::ONE,
        combined: Decimal::ONE,
    };
}

/// Computes risk-budgeted sizes.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    config: DynamicSizingConfig,
}

impl PositionSizer {
    pub fn new(config: DynamicSizingConfig) -> Self {
        Self { config }
    }

    /// Volatility factor: target / realized, clamped. Neutral without a
    /// usable estimate.
    pub fn volatility_factor(&self, realized: Option<f64>) -> Decimal {
        let b = &self.config.bounds;
        match realized {
            Some(vol) if vol > 0.0 && vol.is_finite() => {
                Decimal::try_from(self.config.volatility_target / vol)
                    .map(|f| f.clamp(b.volatility_min, b.volatility_max))
                    .unwrap_or(b.volatility_max)
            }
            _ => Decimal::ONE,
        }
    }

    /// Win-streak factor: 1 + step * streak once the streak qualifies,
    /// clamped to [1, win_streak_max].
    pub fn win_streak_factor(&self, win_streak: u32) -> Decimal {
        let b = &self.config.bounds;
        if win_streak == 0 || win_streak < b.win_streak_min {
            return Decimal::ONE;
        }
        (Decimal::ONE + b.win_streak_step * Decimal::from(win_streak))
            .clamp(Decimal::ONE, b.win_streak_max)
    }

    pub fn multiplier(&self, factors: &DynamicFactors) -> SizingMultiplier {
        if !self.config.enabled {
            return SizingMultiplier::NEUTRAL;
        }

        let volatility = if self.config.volatility_adjustment {
            self.volatility_factor(factors.realized_volatility)
        } else {
            Decimal::ONE
        };
        let win_streak = if self.config.win_streak_bonus {
            self.win_streak_factor(factors.win_streak)
        } else {
            Decimal::ONE
        };
        let b = &self.config.bounds;
        let combined = (volatility * win_streak).clamp(b.total_min, b.total_max);

        SizingMultiplier {
            volatility,
            win_streak,
            combined,
        }
    }

    /// Size such that a stop fill loses at most `equity * risk_pct`.
    ///
    /// The dynamic multiplier is scaled by `total_max`, so the configured
    /// risk fraction is reached only at the largest allowed multiplier.
    /// The result is truncated to `lot_decimals`; a zero stop distance gives 0.
    pub fn size(
        &self,
        equity: Decimal,
        risk_pct: Decimal,
        entry: Decimal,
        stop: Decimal,
        factors: &DynamicFactors,
        lot_decimals: u32,
    ) -> Decimal {
        let distance = (entry - stop).abs();
        if distance.is_zero() || equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let mut size = equity * risk_pct / distance;
        if self.config.enabled {
            let multiplier = self.multiplier(factors);
            size = size * multiplier.combined / self.config.bounds.total_max;
        }

        size.round_dp_with_strategy(lot_decimals, RoundingStrategy::ToZero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn enabled() -> DynamicSizingConfig {
        DynamicSizingConfig {
            enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_base_size_when_disabled() {
        let sizer = PositionSizer::new(DynamicSizingConfig::default());
        let size = sizer.size(
            dec!(10000),
            dec!(0.01),
            dec!(1.1000),
            dec!(1.0950),
            &DynamicFactors::default(),
            2,
        );
        assert_eq!(size, dec!(20));
    }

    #[test]
    fn test_enabled_scales_risk_by_total_max() {
        let sizer = PositionSizer::new(enabled());
        let neutral = sizer.size(
            dec!(10000),
            dec!(0.01),
            dec!(1.1000),
            dec!(1.0950),
            &DynamicFactors::default(),
            2,
        );
        // 20 * 1.0 / 2.0
        assert_eq!(neutral, dec!(10));

        let hot = DynamicFactors {
            realized_volatility: Some(0.0001),
            win_streak: 10,
        };
        assert_eq!(sizer.multiplier(&hot).combined, dec!(2.0));
        let full = sizer.size(dec!(10000), dec!(0.01), dec!(1.1000), dec!(1.0950), &hot, 2);
        assert_eq!(full, dec!(20));
    }

    #[test]
    fn test_zero_distance_gives_zero() {
        let sizer = PositionSizer::new(enabled());
        let size = sizer.size(dec!(10000), dec!(0.01), dec!(1.1), dec!(1.1), &DynamicFactors::default(), 2);
        assert_eq!(size, Decimal::ZERO);
    }

    #[test]
    fn test_win_streak_multiplier() {
        let sizer = PositionSizer::new(enabled());
        assert_eq!(sizer.win_streak_factor(0), Decimal::ONE);
        assert_eq!(sizer.win_streak_factor(2), dec!(1.2));
        assert_eq!(sizer.win_streak_factor(9), dec!(1.5));

        let capped = PositionSizer::new(DynamicSizingConfig {
            enabled: true,
            bounds: SizingBounds {
                win_streak_max: dec!(1.1),
                ..Default::default()
            },
            ..Default::default()
        });
        assert_eq!(capped.win_streak_factor(2), dec!(1.1));
    }

    #[test]
    fn test_win_streak_needs_min_streak() {
        let sizer = PositionSizer::new(DynamicSizingConfig {
            enabled: true,
            bounds: SizingBounds {
                win_streak_min: 3,
                ..Default::default()
            },
            ..Default::default()
        });
        assert_eq!(sizer.win_streak_factor(2), Decimal::ONE);
        assert_eq!(sizer.win_streak_factor(3), dec!(1.3));
    }

    #[test]
    fn test_volatility_factor_is_inverse_and_clamped() {
        let sizer = PositionSizer::new(enabled());
        // target 0.001
        assert_eq!(sizer.volatility_factor(Some(0.001)), Decimal::ONE);
        assert_eq!(sizer.volatility_factor(Some(0.01)), dec!(0.5));
        assert_eq!(sizer.volatility_factor(Some(0.0001)), dec!(1.5));
        assert_eq!(sizer.volatility_factor(None), Decimal::ONE);
        assert_eq!(sizer.volatility_factor(Some(0.0)), Decimal::ONE);
    }

    #[test]
    fn test_combined_multiplier_clamped() {
        let sizer = PositionSizer::new(DynamicSizingConfig {
            enabled: true,
            bounds: SizingBounds {
                total_max: dec!(1.2),
                ..Default::default()
            },
            ..Default::default()
        });
        let m = sizer.multiplier(&DynamicFactors {
            realized_volatility: Some(0.0001),
            win_streak: 5,
        });
        assert_eq!(m.volatility, dec!(1.5));
        assert_eq!(m.win_streak, dec!(1.5));
        assert_eq!(m.combined, dec!(1.2));
    }

    #[test]
    fn test_disabled_is_neutral() {
        let sizer = PositionSizer::new(DynamicSizingConfig::default());
        let m = sizer.multiplier(&DynamicFactors {
            realized_volatility: Some(0.0001),
            win_streak: 5,
        });
        assert_eq!(m, SizingMultiplier::NEUTRAL);
    }

    proptest! {
        #[test]
        fn prop_size_never_exceeds_risk_budget(
            equity in 100u32..1_000_000,
            risk_bp in 1u32..500,
            entry_pips in 5_000u32..20_000,
            stop_offset in 1u32..2_000,
            long in any::<bool>(),
            dynamic in any::<bool>(),
            vol_bp in 0u32..100,
            streak in 0u32..10,
            lot_decimals in 0u32..5,
        ) {
            let equity = Decimal::from(equity);
            let risk = Decimal::new(risk_bp as i64, 4);
            let entry = Decimal::new(entry_pips as i64, 4);
            let offset = Decimal::new(stop_offset as i64, 4);
            let stop = if long { entry - offset } else { entry + offset };
            let sizer = PositionSizer::new(DynamicSizingConfig {
                enabled: dynamic,
                ..Default::default()
            });
            let factors = DynamicFactors {
                realized_volatility: if vol_bp == 0 { None } else { Some(vol_bp as f64 / 10_000.0) },
                win_streak: streak,
            };

            let size = sizer.size(equity, risk, entry, stop, &factors, lot_decimals);
            prop_assert!(size >= Decimal::ZERO);
            prop_assert!(size * (entry - stop).abs() <= equity * risk);
        }
    }
}
