//! Risk management for the trend engine.
//!
//! Entry gating against account limits, risk-budgeted position sizing with
//! optional dynamic multipliers, and monotonic trailing stops.

mod limits;
mod position_sizer;
mod risk_manager;
mod trailing_stop;

pub use limits::{AccountState, RiskLimits, RiskScope, RiskViolation};
pub use position_sizer::{
    DynamicFactors, DynamicSizingConfig, PositionSizer, SizingBounds, SizingMultiplier,
};
pub use risk_manager::{RiskDecision, RiskManager};
pub use trailing_stop::{DistanceMode, StopUpdate, TrailingStopConfig, TrailingStopManager};
