//! Simple moving average.

use trading_core::error::IndicatorError;
use trading_core::traits::Indicator;

/// Arithmetic mean of the last N values, computed with a sliding sum.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "SMA period must be greater than 0".into(),
            ));
        }
        Ok(Self { period })
    }

    /// Mean of the window ending `offset` values before the newest one.
    /// `offset = 0` is the current average, `offset = 1` the previous bar's.
    pub fn at_offset(&self, data: &[f64], offset: usize) -> Option<f64> {
        let end = data.len().checked_sub(offset)?;
        let start = end.checked_sub(self.period)?;
        Some(data[start..end].iter().sum::<f64>() / self.period as f64)
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let mut result = Vec::with_capacity(data.len() - self.period + 1);
        let period_f64 = self.period as f64;

        let mut sum: f64 = data[..self.period].iter().sum();
        result.push(sum / period_f64);

        for i in self.period..data.len() {
            sum = sum - data[i - self.period] + data[i];
            result.push(sum / period_f64);
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }

    fn latest(&self, data: &[f64]) -> Option<f64> {
        self.at_offset(data, 0)
    }
}
