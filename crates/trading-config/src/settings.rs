//! Configuration structures.
//!
//! Every section is optional in the file; missing keys take the defaults
//! below. Percentages are fractions (0.01 = 1%).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use trading_core::traits::StrategyConfig;
use trading_core::types::{RunMode, Timeframe};
use trading_risk::{DynamicSizingConfig, RiskLimits, TrailingStopConfig};
use trading_strategies::CrossoverConfig;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl SettingsError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SettingsError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<(&'static str, String)> for SettingsError {
    fn from((field, reason): (&'static str, String)) -> Self {
        SettingsError::invalid(field, reason)
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub symbols: Vec<String>,
    pub timeframe_minutes: u32,
    pub poll_interval_seconds: u64,
    pub warmup_bars: usize,
    pub run_mode: RunMode,
    pub logging: LoggingConfig,
    pub strategy: CrossoverConfig,
    pub account: AccountSettings,
    pub risk: RiskLimits,
    pub trailing_stop: TrailingStopConfig,
    pub dynamic_sizing: DynamicSizingConfig,
    pub metrics: MetricsSettings,
    pub feed: FeedConfig,
    pub paper: PaperSettings,
    pub storage: StorageSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["EURUSD".to_string()],
            timeframe_minutes: 5,
            poll_interval_seconds: 5,
            warmup_bars: 200,
            run_mode: RunMode::Paper,
            logging: LoggingConfig::default(),
            strategy: CrossoverConfig::default(),
            account: AccountSettings::default(),
            risk: RiskLimits::default(),
            trailing_stop: TrailingStopConfig::default(),
            dynamic_sizing: DynamicSizingConfig::default(),
            metrics: MetricsSettings::default(),
            feed: FeedConfig::default(),
            paper: PaperSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl AppConfig {
    /// Check every section. The first problem found is returned.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.symbols.is_empty() {
            return Err(SettingsError::invalid("symbols", "at least one symbol is required"));
        }
        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if symbol.trim().is_empty() {
                return Err(SettingsError::invalid("symbols", "symbol names must not be empty"));
            }
            if !seen.insert(symbol) {
                return Err(SettingsError::invalid("symbols", format!("{} listed twice", symbol)));
            }
        }

        self.timeframe()?;
        if self.poll_interval_seconds == 0 {
            return Err(SettingsError::invalid("poll_interval_seconds", "must be at least 1"));
        }

        self.strategy
            .validate()
            .map_err(|e| SettingsError::invalid("strategy", e.to_string()))?;
        self.risk.validate()?;
        self.trailing_stop.validate()?;
        self.dynamic_sizing.validate()?;

        if self.account.starting_equity <= Decimal::ZERO {
            return Err(SettingsError::invalid("account.starting_equity", "must be positive"));
        }
        self.metrics.validate()?;
        self.feed.validate()?;
        self.paper.validate()?;
        Ok(())
    }

    pub fn timeframe(&self) -> Result<Timeframe, SettingsError> {
        Timeframe::from_minutes(self.timeframe_minutes).ok_or_else(|| {
            SettingsError::invalid(
                "timeframe_minutes",
                format!("{} is not one of 1, 5, 15, 30, 60, 240, 1440", self.timeframe_minutes),
            )
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    /// Resolved configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    pub starting_equity: Decimal,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            starting_equity: dec!(10000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Return periods per year used to annualize the Sharpe ratio
    pub periods_per_year: f64,
    /// Heartbeat and metrics persistence interval, in runner cycles
    pub snapshot_every_cycles: u64,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            periods_per_year: 252.0,
            snapshot_every_cycles: 5,
        }
    }
}

impl MetricsSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        if !(self.periods_per_year.is_finite() && self.periods_per_year > 0.0) {
            return Err(SettingsError::invalid("metrics.periods_per_year", "must be positive"));
        }
        if self.snapshot_every_cycles == 0 {
            return Err(SettingsError::invalid("metrics.snapshot_every_cycles", "must be at least 1"));
        }
        Ok(())
    }
}

/// Market data feed timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub timeout_seconds: u64,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            initial_backoff_ms: 500,
            max_backoff_ms: 60_000,
        }
    }
}

impl FeedConfig {
    fn validate(&self) -> Result<(), SettingsError> {
        if self.timeout_seconds == 0 {
            return Err(SettingsError::invalid("feed.timeout_seconds", "must be at least 1"));
        }
        if self.initial_backoff_ms == 0 {
            return Err(SettingsError::invalid("feed.initial_backoff_ms", "must be at least 1"));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(SettingsError::invalid(
                "feed.max_backoff_ms",
                "must not be below initial_backoff_ms",
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Simulated feed and fills for paper mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperSettings {
    /// Adverse fill slippage as a fraction of price
    pub slippage_pct: Decimal,
    pub seed: u64,
    pub start_price: f64,
    /// Per-bar random-walk amplitude as a fraction of price
    pub volatility: f64,
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            slippage_pct: dec!(0.0001),
            seed: 42,
            start_price: 1.1,
            volatility: 0.001,
        }
    }
}

impl PaperSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        if self.slippage_pct < Decimal::ZERO || self.slippage_pct >= dec!(0.1) {
            return Err(SettingsError::invalid("paper.slippage_pct", "must be in [0, 0.1)"));
        }
        if !(self.start_price.is_finite() && self.start_price > 0.0) {
            return Err(SettingsError::invalid("paper.start_price", "must be positive"));
        }
        if !(self.volatility.is_finite() && self.volatility > 0.0 && self.volatility < 1.0) {
            return Err(SettingsError::invalid("paper.volatility", "must be in (0, 1)"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for the trade log, metrics and risk state
    pub dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeframe().unwrap(), Timeframe::Minute5);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_rejections_name_the_field() {
        let cases: Vec<(&str, Box<dyn Fn(&mut AppConfig)>)> = vec![
            ("symbols", Box::new(|c: &mut AppConfig| c.symbols.clear())),
            ("symbols", Box::new(|c: &mut AppConfig| c.symbols.push("EURUSD".into()))),
            ("timeframe_minutes", Box::new(|c: &mut AppConfig| c.timeframe_minutes = 7)),
            ("risk.max_drawdown_pct", Box::new(|c: &mut AppConfig| c.risk.max_drawdown_pct = dec!(1.5))),
            ("trailing_stop.distance_value", Box::new(|c: &mut AppConfig| c.trailing_stop.distance_value = Decimal::ZERO)),
            ("account.starting_equity", Box::new(|c: &mut AppConfig| c.account.starting_equity = dec!(-1))),
            ("metrics.snapshot_every_cycles", Box::new(|c: &mut AppConfig| c.metrics.snapshot_every_cycles = 0)),
            ("feed.max_backoff_ms", Box::new(|c: &mut AppConfig| c.feed.max_backoff_ms = 1)),
            ("paper.slippage_pct", Box::new(|c: &mut AppConfig| c.paper.slippage_pct = dec!(0.5))),
        ];

        for (expected, mutate) in cases {
            let mut config = AppConfig::default();
            mutate(&mut config);
            match config.validate() {
                Err(SettingsError::Invalid { field, .. }) => assert_eq!(field, expected),
                other => panic!("{}: expected invalid, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_resolved_config_renders_as_toml() {
        let rendered = AppConfig::default().to_toml().unwrap();
        assert!(rendered.contains("run_mode = \"paper\""));
        assert!(rendered.contains("[trailing_stop]"));

        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.symbols, vec!["EURUSD"]);
        assert_eq!(parsed.risk, RiskLimits::default());
    }
}
