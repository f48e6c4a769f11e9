//! Order executors.

mod paper;

pub use paper::{PaperExecutor, PaperFill, MAX_FILL_LOG};
