//! Directional signals produced from a bar window.

use serde::{Deserialize, Serialize};

use super::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
    Flat,
}

impl Direction {
    /// Side to open for this direction, `None` for flat.
    pub fn side(&self) -> Option<Side> {
        match self {
            Direction::Long => Some(Side::Long),
            Direction::Short => Some(Side::Short),
            Direction::Flat => None,
        }
    }

    /// Whether this direction argues against holding `side`.
    pub fn opposes(&self, side: Side) -> bool {
        matches!(
            (self, side),
            (Direction::Long, Side::Short) | (Direction::Short, Side::Long)
        )
    }
}

/// A signal for one symbol at one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    /// Relative separation of the averages, when known
    pub strength: Option<f64>,
    /// Index of the bar the signal was generated on
    pub bar_index: u64,
    /// Open time of that bar, Unix ms
    pub timestamp: i64,
    pub fast: Option<f64>,
    pub slow: Option<f64>,
}

impl Signal {
    pub fn flat(symbol: impl Into<String>, bar_index: u64, timestamp: i64) -> Self {
        Self {
            symbol: symbol.into(),
            direction: Direction::Flat,
            strength: None,
            bar_index,
            timestamp,
            fast: None,
            slow: None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.direction == Direction::Flat
    }
}
