//! Trading engine: one state machine per symbol, driven by a runner that
//! replays history or polls a live feed through the same code path.

mod engine;
mod runner;
mod source;

pub use engine::{CycleContext, EngineEvent, EngineState, ExitReason, TradingEngine};
pub use runner::{RunOutcome, Runner, RunnerConfig};
pub use source::{BarSource, CycleBars, FeedSettings, HistoricalBarSource, PollingBarSource};
