//! How a run sources bars and fills orders.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Simulated fills against a live-style polled feed
    #[default]
    Paper,
    Live,
    /// Deterministic replay of historical bars
    Backtest,
}

impl RunMode {
    /// Whether the run polls a feed and waits between cycles.
    pub fn is_polling(&self) -> bool {
        !matches!(self, RunMode::Backtest)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Paper => write!(f, "paper"),
            RunMode::Live => write!(f, "live"),
            RunMode::Backtest => write!(f, "backtest"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "paper" => Ok(RunMode::Paper),
            "live" => Ok(RunMode::Live),
            "backtest" => Ok(RunMode::Backtest),
            other => Err(format!("unknown run mode: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Backtest".parse::<RunMode>().unwrap(), RunMode::Backtest);
        assert_eq!(RunMode::Paper.to_string(), "paper");
        assert!("replay".parse::<RunMode>().is_err());
        assert!(!RunMode::Backtest.is_polling());
    }
}
