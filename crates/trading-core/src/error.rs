//! Error types for the trend engine.
//!
//! Risk limit breaches are not errors: they are reported as decisions by the
//! risk crate. Everything here is a genuine failure of a collaborator or of
//! the input.

use thiserror::Error;

/// Top-level error for one engine step or runner cycle.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Out-of-order bar for {symbol}: {timestamp} is not after {last}")]
    OutOfOrderBar {
        symbol: String,
        timestamp: i64,
        last: i64,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Signal generator errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {required} bars, have {available}")]
    InsufficientData { required: usize, available: usize },
}

/// Order execution failures reported by an [`crate::OrderExecutor`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Order rejected for {symbol}: {reason}")]
    OrderRejected { symbol: String, reason: String },

    #[error("No market price known for {0}")]
    NoPrice(String),

    #[error("Invalid order size {size} for {symbol}")]
    InvalidSize {
        symbol: String,
        size: rust_decimal::Decimal,
    },

    #[error("Executor unavailable: {0}")]
    Unavailable(String),
}

/// Market data failures. `Timeout` and `Unavailable` are transient.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No data available for the requested range")]
    NoDataAvailable,

    #[error("Timed out waiting for {symbol} after {millis} ms")]
    Timeout { symbol: String, millis: u64 },

    #[error("Data feed unavailable: {0}")]
    Unavailable(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl DataError {
    /// Whether retrying later can be expected to succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DataError::Timeout { .. } | DataError::Unavailable(_))
    }
}

/// Indicator calculation errors.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Persistence failures. Logged by the engine, never fatal to a transition.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for trading operations.
pub type TradingResult<T> = Result<T, TradingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_data_errors() {
        assert!(DataError::Timeout {
            symbol: "EURUSD".into(),
            millis: 500
        }
        .is_transient());
        assert!(DataError::Unavailable("down".into()).is_transient());
        assert!(!DataError::ParseError("bad row".into()).is_transient());
    }

    #[test]
    fn test_error_conversion() {
        let err: TradingError = ExecutionError::NoPrice("GBPUSD".into()).into();
        assert!(matches!(err, TradingError::Execution(_)));
        assert_eq!(
            err.to_string(),
            "Execution error: No market price known for GBPUSD"
        );
    }
}
