//! In-memory store for backtests and tests.

use async_trait::async_trait;
use std::io;
use trading_core::error::StoreError;
use trading_core::types::Position;
use trading_metrics::MetricsSnapshot;

use crate::{PersistenceStore, RiskState};

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub trades: Vec<Position>,
    pub metrics: Vec<MetricsSnapshot>,
    pub risk_state: Option<RiskState>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn with_risk_state(mut self, state: RiskState) -> Self {
        self.risk_state = Some(state);
        self
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                "memory store configured to fail",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn record_trade(&mut self, position: &Position) -> Result<(), StoreError> {
        self.check()?;
        self.trades.push(position.clone());
        Ok(())
    }

    async fn record_metrics(&mut self, snapshot: &MetricsSnapshot) -> Result<(), StoreError> {
        self.check()?;
        self.metrics.push(snapshot.clone());
        Ok(())
    }

    async fn load_risk_state(&self) -> Result<Option<RiskState>, StoreError> {
        Ok(self.risk_state.clone())
    }

    async fn save_risk_state(&mut self, state: &RiskState) -> Result<(), StoreError> {
        self.check()?;
        self.risk_state = Some(state.clone());
        Ok(())
    }
}
