//! Logging setup and run-session monitoring.

mod logging;
mod session;

pub use logging::{setup_logging, LogGuard};
pub use session::{Heartbeat, SessionMonitor};
