//! Core types and traits for the trend engine.
//!
//! - Market data (`Bar`, `BarSeries`, `Timeframe`)
//! - Position lifecycle (`Position`, `TradeResult`) and signals
//! - Collaborator traits: signal generators, indicators, market data, order execution

pub mod error;
pub mod traits;
pub mod types;

pub use error::{TradingError, TradingResult};
pub use traits::*;
pub use types::*;
