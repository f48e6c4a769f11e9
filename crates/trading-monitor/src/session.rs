//! Run-session identity and periodic heartbeats.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

/// One heartbeat line worth of runner state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heartbeat {
    pub cycle: u64,
    pub symbols: usize,
    pub open_positions: usize,
    pub equity: Decimal,
    pub trades: usize,
    pub errors: u64,
    pub halted: bool,
}

/// Tracks a single runner session from start to shutdown.
#[derive(Debug)]
pub struct SessionMonitor {
    id: Uuid,
    started_at: DateTime<Utc>,
    started: Instant,
    last_beat: Instant,
    beats: u64,
}

impl SessionMonitor {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            started: now,
            last_beat: now,
            beats: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Log an `engine ok` heartbeat with the wall time since the previous one.
    pub fn heartbeat(&mut self, beat: &Heartbeat) {
        let loop_s = self.last_beat.elapsed().as_secs_f64();
        self.last_beat = Instant::now();
        self.beats += 1;

        info!(
            cycle = beat.cycle,
            loop_s = format!("{:.2}", loop_s),
            symbols = beat.symbols,
            open_pos = beat.open_positions,
            equity = %beat.equity,
            trades = beat.trades,
            errors = beat.errors,
            halted = beat.halted,
            "engine ok"
        );
    }

    /// Log the end-of-session line.
    pub fn finish(&self, cycles: u64, trades: usize, equity: Decimal) {
        info!(
            session = %self.id,
            cycles,
            trades,
            equity = %equity,
            started_at = %self.started_at.to_rfc3339(),
            heartbeats = self.beats,
            uptime_s = self.started.elapsed().as_secs(),
            "Session finished"
        );
    }
}

impl Default for SessionMonitor {
    fn default() -> Self {
        Self::new()
    }
}
