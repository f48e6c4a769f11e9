//! Volatility measures: standard deviation, ATR and realized return volatility.

use trading_core::error::IndicatorError;
use trading_core::traits::Indicator;
use trading_core::types::BarSeries;

/// Rolling population standard deviation.
#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
}

impl StdDev {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period < 2 {
            return Err(IndicatorError::InvalidParameter(
                "StdDev period must be at least 2".into(),
            ));
        }
        Ok(Self { period })
    }
}

impl Indicator for StdDev {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let period_f64 = self.period as f64;
        data.windows(self.period)
            .map(|window| {
                let mean = window.iter().sum::<f64>() / period_f64;
                let variance =
                    window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period_f64;
                variance.sqrt()
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "StdDev"
    }
}

/// Average True Range with Wilder smoothing.
///
/// The first value is the mean of the first `period` true ranges; each
/// later value is `(prev * (period - 1) + tr) / period`.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "ATR period must be greater than 0".into(),
            ));
        }
        Ok(Self { period })
    }

    /// Bars needed for the first value: one prior close plus `period` ranges.
    pub fn bars_required(&self) -> usize {
        self.period + 1
    }

    pub fn calculate_ohlc(&self, high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
        let len = high.len().min(low.len()).min(close.len());
        if len < self.bars_required() {
            return vec![];
        }

        let tr: Vec<f64> = (1..len)
            .map(|i| {
                let high_low = high[i] - low[i];
                let high_close = (high[i] - close[i - 1]).abs();
                let low_close = (low[i] - close[i - 1]).abs();
                high_low.max(high_close).max(low_close)
            })
            .collect();

        let period_f64 = self.period as f64;
        let mut result = Vec::with_capacity(tr.len() - self.period + 1);

        let mut atr: f64 = tr[..self.period].iter().sum::<f64>() / period_f64;
        result.push(atr);

        for &tr_val in &tr[self.period..] {
            atr = (atr * (period_f64 - 1.0) + tr_val) / period_f64;
            result.push(atr);
        }

        result
    }

    /// Current ATR of a bar window, `None` until enough bars exist.
    pub fn latest_for(&self, series: &BarSeries) -> Option<f64> {
        if series.len() < self.bars_required() {
            return None;
        }
        self.calculate_ohlc(&series.highs(), &series.lows(), &series.closes())
            .pop()
    }
}

/// Sample standard deviation of simple close-to-close returns over the last
/// `lookback` returns. `None` with fewer than two returns or a non-positive
/// price in the window.
pub fn realized_volatility(closes: &[f64], lookback: usize) -> Option<f64> {
    if lookback < 2 || closes.len() < lookback + 1 {
        return None;
    }

    let window = &closes[closes.len() - lookback - 1..];
    let mut returns = Vec::with_capacity(lookback);
    for pair in window.windows(2) {
        if pair[0] <= 0.0 {
            return None;
        }
        returns.push(pair[1] / pair[0] - 1.0);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use trading_core::types::{Bar, Timeframe};

    #[test]
    fn test_std_dev() {
        let std_dev = StdDev::new(8).unwrap();
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let result = std_dev.calculate(&data);

        assert_eq!(result.len(), 1);
        assert_relative_eq!(result[0], 2.0, epsilon = 1e-12);
        assert!(StdDev::new(1).is_err());
    }

    #[test]
    fn test_atr_constant_range() {
        let atr = Atr::new(3).unwrap();
        let high = vec![11.0, 11.0, 11.0, 11.0, 11.0];
        let low = vec![9.0, 9.0, 9.0, 9.0, 9.0];
        let close = vec![10.0, 10.0, 10.0, 10.0, 10.0];

        let result = atr.calculate_ohlc(&high, &low, &close);
        assert_eq!(result.len(), 2);
        assert_relative_eq!(result[0], 2.0);
        assert_relative_eq!(result[1], 2.0);
    }

    #[test]
    fn test_atr_wilder_smoothing() {
        let atr = Atr::new(2).unwrap();
        // true ranges: 2, 2, 5
        let high = vec![11.0, 11.0, 11.0, 14.0];
        let low = vec![9.0, 9.0, 9.0, 9.0];
        let close = vec![10.0, 10.0, 10.0, 10.0];

        let result = atr.calculate_ohlc(&high, &low, &close);
        assert_eq!(result.len(), 2);
        assert_relative_eq!(result[1], 3.5);
    }

    #[test]
    fn test_atr_latest_for_series() {
        let atr = Atr::new(2).unwrap();
        let mut series = BarSeries::new("EURUSD", Timeframe::Minute5);
        series.push(Bar::new(0, 10.0, 11.0, 9.0, 10.0, 0.0));
        series.push(Bar::new(1, 10.0, 11.0, 9.0, 10.0, 0.0));
        assert!(atr.latest_for(&series).is_none());

        series.push(Bar::new(2, 10.0, 11.0, 9.0, 10.0, 0.0));
        assert_eq!(atr.latest_for(&series), Some(2.0));
    }

    #[test]
    fn test_realized_volatility() {
        assert!(realized_volatility(&[1.0, 1.0], 2).is_none());
        assert_eq!(realized_volatility(&[1.0, 1.0, 1.0, 1.0], 3), Some(0.0));

        // returns +10%, -10%: mean 0, sample std sqrt(0.02)
        let vol = realized_volatility(&[100.0, 110.0, 99.0], 2).unwrap();
        assert_relative_eq!(vol, 0.02f64.sqrt(), epsilon = 1e-12);
    }
}
