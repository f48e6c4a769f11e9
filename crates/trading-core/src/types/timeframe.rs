//! Bar timeframes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timeframe for bars/candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    #[default]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Daily,
}

impl Timeframe {
    /// Map a configured bar length in minutes onto a timeframe.
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        match minutes {
            1 => Some(Timeframe::Minute1),
            5 => Some(Timeframe::Minute5),
            15 => Some(Timeframe::Minute15),
            30 => Some(Timeframe::Minute30),
            60 => Some(Timeframe::Hour1),
            240 => Some(Timeframe::Hour4),
            1440 => Some(Timeframe::Daily),
            _ => None,
        }
    }

    pub fn as_secs(&self) -> u64 {
        match self {
            Timeframe::Minute1 => 60,
            Timeframe::Minute5 => 300,
            Timeframe::Minute15 => 900,
            Timeframe::Minute30 => 1800,
            Timeframe::Hour1 => 3600,
            Timeframe::Hour4 => 14400,
            Timeframe::Daily => 86400,
        }
    }

    pub fn as_millis(&self) -> i64 {
        self.as_secs() as i64 * 1000
    }

    /// Bars per year assuming a 24h market, for annualizing per-bar returns.
    pub fn periods_per_year(&self) -> f64 {
        365.0 * 86400.0 / self.as_secs() as f64
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Daily => "1d",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" | "1min" | "m1" => Ok(Timeframe::Minute1),
            "5m" | "5min" | "m5" => Ok(Timeframe::Minute5),
            "15m" | "15min" | "m15" => Ok(Timeframe::Minute15),
            "30m" | "30min" | "m30" => Ok(Timeframe::Minute30),
            "1h" | "h1" => Ok(Timeframe::Hour1),
            "4h" | "h4" => Ok(Timeframe::Hour4),
            "1d" | "d1" | "daily" => Ok(Timeframe::Daily),
            _ => Err(format!("Invalid timeframe: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minutes() {
        assert_eq!(Timeframe::from_minutes(5), Some(Timeframe::Minute5));
        assert_eq!(Timeframe::from_minutes(60), Some(Timeframe::Hour1));
        assert_eq!(Timeframe::from_minutes(7), None);
    }

    #[test]
    fn test_timeframe_parse_and_display() {
        assert_eq!(Timeframe::from_str("M5").unwrap(), Timeframe::Minute5);
        assert_eq!(Timeframe::from_str("daily").unwrap(), Timeframe::Daily);
        assert_eq!(Timeframe::Minute15.to_string(), "15m");
    }

    #[test]
    fn test_durations() {
        assert_eq!(Timeframe::Minute5.as_millis(), 300_000);
        assert_eq!(Timeframe::Daily.periods_per_year(), 365.0);
    }
}
