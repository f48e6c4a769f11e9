//! CSV bar loader for historical replay.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use trading_core::error::DataError;
use trading_core::types::Bar;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp", alias = "time", alias = "Time")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", alias = "tick_volume", default)]
    volume: f64,
}

/// One CSV file of OHLCV bars for a single symbol.
pub struct CsvDataSource {
    path: PathBuf,
}

impl CsvDataSource {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DataError::SymbolNotFound(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Load every bar, sorted by time with duplicate timestamps dropped
    /// (first occurrence wins).
    pub fn load_bars(&self) -> Result<Vec<Bar>, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        let mut bars = Vec::new();
        for (line, result) in reader.deserialize().enumerate() {
            let record: CsvRecord = result
                .map_err(|e| DataError::ParseError(format!("row {}: {}", line + 1, e)))?;
            let timestamp = parse_timestamp(&record.date)?;
            bars.push(Bar::new(
                timestamp,
                record.open,
                record.high,
                record.low,
                record.close,
                record.volume,
            ));
        }

        bars.sort_by_key(|b| b.timestamp);
        let before = bars.len();
        bars.dedup_by_key(|b| b.timestamp);
        if bars.len() < before {
            warn!(
                path = %self.path.display(),
                dropped = before - bars.len(),
                "Dropped bars with duplicate timestamps"
            );
        }

        if bars.is_empty() {
            return Err(DataError::NoDataAvailable);
        }
        Ok(bars)
    }
}

/// Load `<SYMBOL>.csv` for each symbol from `dir`, or the single file at
/// `path` when exactly one symbol is requested.
pub fn load_symbols(path: &Path, symbols: &[String]) -> Result<BTreeMap<String, Vec<Bar>>, DataError> {
    let mut data = BTreeMap::new();

    if path.is_file() {
        let [symbol] = symbols else {
            return Err(DataError::ParseError(format!(
                "{} is a single file but {} symbols were requested",
                path.display(),
                symbols.len()
            )));
        };
        data.insert(symbol.clone(), CsvDataSource::new(path)?.load_bars()?);
    } else {
        for symbol in symbols {
            let file = path.join(format!("{}.csv", symbol));
            let bars = CsvDataSource::new(&file)?.load_bars()?;
            info!(symbol = %symbol, bars = bars.len(), "Loaded historical bars");
            data.insert(symbol.clone(), bars);
        }
    }

    Ok(data)
}

fn parse_timestamp(date_str: &str) -> Result<i64, DataError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Ok(dt.timestamp_millis());
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y.%m.%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc().timestamp_millis());
            }
        }
    }

    if let Ok(ts) = date_str.parse::<i64>() {
        // more than 10 digits means milliseconds
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(DataError::ParseError(format!("Could not parse date: {}", date_str)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("2024-01-15").unwrap(), 1_705_276_800_000);
        assert_eq!(parse_timestamp("2024-01-15 10:30:00").unwrap(), 1_705_314_600_000);
        assert_eq!(parse_timestamp("2024-01-15T10:30:00Z").unwrap(), 1_705_314_600_000);
        assert_eq!(parse_timestamp("1705312800000").unwrap(), 1_705_312_800_000);
        assert_eq!(parse_timestamp("1705312800").unwrap(), 1_705_312_800_000);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_load_sorts_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("EURUSD.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "time,open,high,low,close,volume").unwrap();
        writeln!(file, "2024-01-01 00:10:00,1.2,1.3,1.1,1.25,10").unwrap();
        writeln!(file, "2024-01-01 00:05:00,1.1,1.2,1.0,1.15,10").unwrap();
        writeln!(file, "2024-01-01 00:10:00,9.9,9.9,9.9,9.9,10").unwrap();
        drop(file);

        let bars = CsvDataSource::new(&path).unwrap().load_bars().unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[0].timestamp < bars[1].timestamp);
        assert_eq!(bars[1].close, 1.25);

        let data = load_symbols(dir.path(), &["EURUSD".to_string()]).unwrap();
        assert_eq!(data["EURUSD"].len(), 2);
        assert!(load_symbols(dir.path(), &["GBPUSD".to_string()]).is_err());
    }
}
