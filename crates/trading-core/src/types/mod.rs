//! Core data types for the trend engine.

mod mode;
mod ohlcv;
mod position;
mod signal;
mod timeframe;

pub use mode::RunMode;
pub use ohlcv::{Bar, BarSeries};
pub use position::{Position, PositionStatus, Side, TradeResult};
pub use signal::{Direction, Signal};
pub use timeframe::Timeframe;
