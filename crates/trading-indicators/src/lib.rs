//! Technical indicators used by the trend engine.
//!
//! - Simple moving average for crossover signals
//! - ATR for volatility-scaled trailing stops
//! - Standard deviation and realized return volatility for dynamic sizing

pub mod moving_average;
pub mod volatility;

pub use moving_average::Sma;
pub use volatility::{realized_volatility, Atr, StdDev};
