//! Order execution trait.

use crate::error::ExecutionError;
use crate::types::{Position, Side};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Places and closes market orders for the engine.
///
/// Both calls return the fill price. A rejection leaves the engine's state
/// untouched: a failed entry stays flat, a failed exit is retried on the next
/// bar.
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    async fn open_position(
        &mut self,
        symbol: &str,
        side: Side,
        size: Decimal,
    ) -> Result<Decimal, ExecutionError>;

    async fn close_position(&mut self, position: &Position) -> Result<Decimal, ExecutionError>;

    /// Latest observed price for a symbol. Simulated executors fill against it.
    fn on_market_price(&mut self, _symbol: &str, _price: Decimal) {}

    fn name(&self) -> &str;
}
