//! Core traits for the trend engine.

mod data_source;
mod executor;
mod indicator;
mod strategy;

pub use data_source::{MarketDataProvider, Tick};
pub use executor::OrderExecutor;
pub use indicator::Indicator;
pub use strategy::{Strategy, StrategyConfig};
