//! OHLCV bars and the rolling per-symbol window the engine evaluates.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::Timeframe;

/// One completed price bar.
///
/// Prices are `f64` for indicator math; conversion to `Decimal` happens at the
/// order boundary through [`Bar::close_decimal`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time, Unix milliseconds (UTC)
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Flat bar where every price equals `close`. Handy for feeds that only
    /// report a last trade.
    pub fn flat(timestamp: i64, close: f64) -> Self {
        Self::new(timestamp, close, close, close, close, 0.0)
    }

    /// Open time as a UTC datetime, `None` if the timestamp is out of range.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Trading session the bar belongs to (its UTC calendar date).
    pub fn session_date(&self) -> Option<NaiveDate> {
        self.datetime().map(|dt| dt.date_naive())
    }

    /// Close converted for order arithmetic. Non-finite closes yield `None`.
    pub fn close_decimal(&self) -> Option<Decimal> {
        Decimal::try_from(self.close).ok()
    }

    /// True range against the previous close (used for ATR).
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => {
                let hl = self.high - self.low;
                let hc = (self.high - pc).abs();
                let lc = (self.low - pc).abs();
                hl.max(hc).max(lc)
            }
            None => self.high - self.low,
        }
    }
}

/// Rolling window of bars for one symbol.
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub symbol: String,
    pub timeframe: Timeframe,
    bars: VecDeque<Bar>,
    /// Maximum retained bars (0 = unlimited)
    capacity: usize,
}

impl BarSeries {
    /// Create an unbounded series.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars: VecDeque::new(),
            capacity: 0,
        }
    }

    /// Create a series that drops its oldest bar once `capacity` is reached.
    pub fn with_capacity(symbol: impl Into<String>, timeframe: Timeframe, capacity: usize) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a bar, evicting the oldest one when full.
    pub fn push(&mut self, bar: Bar) {
        if self.capacity > 0 && self.bars.len() >= self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
    }

    pub fn extend(&mut self, bars: impl IntoIterator<Item = Bar>) {
        for bar in bars {
            self.push(bar);
        }
    }

    /// Maximum retained bars, 0 when unbounded.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Bar by position, 0 = oldest retained.
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// The most recent `n` closes, oldest first.
    pub fn last_closes(&self, n: usize) -> Vec<f64> {
        let start = self.bars.len().saturating_sub(n);
        self.bars.iter().skip(start).map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_true_range() {
        let bar = Bar::new(1000, 100.0, 110.0, 95.0, 105.0, 1000000.0);

        assert!((bar.true_range(None) - 15.0).abs() < 0.001);
        // gap down from the previous close widens the range
        assert!((bar.true_range(Some(90.0)) - 20.0).abs() < 0.001);
    }

    #[test]
    fn test_session_date_is_utc_day() {
        // 2024-03-01T23:59:00Z and 2024-03-02T00:00:00Z
        let late = Bar::flat(1_709_337_540_000, 1.1);
        let next = Bar::flat(1_709_337_600_000, 1.1);
        assert_eq!(late.session_date(), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(next.session_date(), NaiveDate::from_ymd_opt(2024, 3, 2));
    }

    #[test]
    fn test_close_decimal_rejects_nan() {
        assert!(Bar::flat(1, f64::NAN).close_decimal().is_none());
        assert!(Bar::flat(1, 1.25).close_decimal().is_some());
    }

    #[test]
    fn test_bar_series_capacity() {
        let mut series = BarSeries::with_capacity("EURUSD", Timeframe::Minute5, 3);

        series.push(Bar::new(1, 100.0, 101.0, 99.0, 100.5, 1000.0));
        series.push(Bar::new(2, 100.5, 102.0, 100.0, 101.5, 1000.0));
        series.push(Bar::new(3, 101.5, 103.0, 101.0, 102.5, 1000.0));
        assert_eq!(series.len(), 3);

        series.push(Bar::new(4, 102.5, 104.0, 102.0, 103.5, 1000.0));
        assert_eq!(series.len(), 3);
        assert_eq!(series.get(0).unwrap().timestamp, 2);
        assert_eq!(series.last_closes(2), vec![102.5, 103.5]);
    }
}
