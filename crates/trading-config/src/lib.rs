//! Configuration management.

mod settings;

pub use settings::{
    AccountSettings, AppConfig, FeedConfig, LogFormat, LoggingConfig, MetricsSettings,
    PaperSettings, SettingsError, StorageSettings,
};

use config::{Config, Environment, File};
use std::path::Path;

/// Load configuration from file and environment, then validate it.
///
/// `TRADING__SECTION__KEY` variables override file values, e.g.
/// `TRADING__RISK__MAX_DAILY_LOSS=250`.
pub fn load_config(path: &Path) -> Result<AppConfig, SettingsError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("TRADING")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app: AppConfig = config.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use trading_core::types::RunMode;
    use trading_risk::DistanceMode;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
symbols = ["GBPUSD", "EURUSD"]
run_mode = "backtest"
timeframe_minutes = 15

[risk]
max_daily_loss = 250
risk_per_trade_pct = 0.005

[trailing_stop]
distance_mode = "atr"
distance_value = 2.5
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.symbols, vec!["GBPUSD", "EURUSD"]);
        assert_eq!(config.run_mode, RunMode::Backtest);
        assert_eq!(config.risk.max_daily_loss, dec!(250));
        assert_eq!(config.risk.risk_per_trade_pct, dec!(0.005));
        assert_eq!(config.risk.max_drawdown_pct, dec!(0.20));
        assert_eq!(config.trailing_stop.distance_mode, DistanceMode::Atr);
        assert_eq!(config.trailing_stop.atr_period, 14);
        assert_eq!(config.warmup_bars, 200);
        assert_eq!(config.strategy.slow_period, 30);
    }

    #[test]
    fn test_invalid_values_fail_fast() {
        let file = write_config(
            r#"
[strategy]
fast_period = 30
slow_period = 10
"#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { ref field, .. } if field == "strategy"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Load(_)));
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config("poll_interval_seconds = 30\n");
        std::env::set_var("TRADING__POLL_INTERVAL_SECONDS", "7");
        let config = load_config(file.path());
        std::env::remove_var("TRADING__POLL_INTERVAL_SECONDS");

        assert_eq!(config.unwrap().poll_interval_seconds, 7);
    }
}
