//! Signal generators for the trend engine.

mod sma_crossover;

pub use sma_crossover::{CrossoverConfig, SmaCrossover};
