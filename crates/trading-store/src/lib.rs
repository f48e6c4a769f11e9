//! Persistence for closed trades, metric snapshots and risk state.
//!
//! Store failures are reported as [`StoreError`] and are never fatal to the
//! engine: callers log them and carry on.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use trading_core::error::StoreError;
use trading_core::types::Position;
use trading_metrics::MetricsSnapshot;
use trading_risk::{AccountState, RiskLimits};

/// Limits and accumulators carried across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    pub limits: RiskLimits,
    pub account: AccountState,
}

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Append a closed position to the trade log.
    async fn record_trade(&mut self, position: &Position) -> Result<(), StoreError>;

    async fn record_metrics(&mut self, snapshot: &MetricsSnapshot) -> Result<(), StoreError>;

    /// Last saved risk state, `None` on first start.
    async fn load_risk_state(&self) -> Result<Option<RiskState>, StoreError>;

    async fn save_risk_state(&mut self, state: &RiskState) -> Result<(), StoreError>;
}
