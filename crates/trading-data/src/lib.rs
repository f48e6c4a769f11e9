//! Market data sources: CSV history for backtests and a simulated feed for
//! paper sessions.

mod csv_source;
mod simulated;

pub use csv_source::{load_symbols, CsvDataSource};
pub use simulated::{SimulatedMarketData, SimulationConfig};
