//! JSON file store.
//!
//! Layout under the store directory:
//! - `trades.jsonl`: one closed position per line, append-only
//! - `metrics.json`: latest metrics snapshot
//! - `risk_state.json`: limits and account accumulators
//!
//! Whole-file writes go to a temporary sibling first and are renamed into
//! place, so a crash never leaves a half-written state file.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use trading_core::error::StoreError;
use trading_core::types::Position;
use trading_metrics::MetricsSnapshot;

use crate::{PersistenceStore, RiskState};

const TRADES_FILE: &str = "trades.jsonl";
const METRICS_FILE: &str = "metrics.json";
const RISK_STATE_FILE: &str = "risk_state.json";

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write_atomic<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let target = self.dir.join(name);
        let tmp = self.dir.join(format!("{}.tmp", name));
        let bytes = serde_json::to_vec_pretty(value)?;
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &target).await?;
        debug!(path = %target.display(), "State file written");
        Ok(())
    }

    /// Read back the trade log.
    pub async fn load_trades(&self) -> Result<Vec<Position>, StoreError> {
        let path = self.dir.join(TRADES_FILE);
        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl PersistenceStore for JsonFileStore {
    async fn record_trade(&mut self, position: &Position) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(position)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(TRADES_FILE))
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn record_metrics(&mut self, snapshot: &MetricsSnapshot) -> Result<(), StoreError> {
        self.write_atomic(METRICS_FILE, snapshot).await
    }

    async fn load_risk_state(&self) -> Result<Option<RiskState>, StoreError> {
        match fs::read(self.dir.join(RISK_STATE_FILE)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_risk_state(&mut self, state: &RiskState) -> Result<(), StoreError> {
        self.write_atomic(RISK_STATE_FILE, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use trading_core::types::Side;
    use trading_metrics::MetricsTracker;
    use trading_risk::{AccountState, RiskLimits};

    #[tokio::test]
    async fn test_trade_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path()).await.unwrap();

        for i in 0..3 {
            let mut pos = Position::open(format!("EURUSD-{}", i), "EURUSD", Side::Long, dec!(1.1), dec!(20), dec!(1.095), i);
            pos.close(dec!(1.11), i + 1);
            store.record_trade(&pos).await.unwrap();
        }

        let trades = store.load_trades().await.unwrap();
        assert_eq!(trades.len(), 3);
        assert_eq!(trades[2].id, "EURUSD-2");
        assert_eq!(trades[0].realized_pnl, Some(dec!(0.200)));
    }

    #[tokio::test]
    async fn test_risk_state_round_trip_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("state")).await.unwrap();
        assert!(store.load_risk_state().await.unwrap().is_none());

        let mut account = AccountState::new(dec!(10000));
        account.win_streak = 2;
        account.daily_realized_pnl = dec!(-12.5);
        let state = RiskState {
            limits: RiskLimits::default(),
            account,
        };
        store.save_risk_state(&state).await.unwrap();

        assert_eq!(store.load_risk_state().await.unwrap(), Some(state));
        assert!(!store.dir().join("risk_state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_metrics_overwrites_latest() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path()).await.unwrap();
        let mut tracker = MetricsTracker::new(252.0);

        tracker.record_equity(1, dec!(100));
        store.record_metrics(&tracker.snapshot()).await.unwrap();
        tracker.record_equity(2, dec!(90));
        store.record_metrics(&tracker.snapshot()).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("metrics.json")).unwrap();
        let snapshot: MetricsSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(snapshot.equity_curve.len(), 2);
        assert_eq!(snapshot.max_drawdown, dec!(10));
    }
}
