//! Live trading command implementation.

use anyhow::{bail, Result};
use tracing::warn;
use trading_config::AppConfig;

pub async fn run(config: &AppConfig) -> Result<()> {
    warn!(symbols = ?config.symbols, "Live trading requested");
    bail!(
        "Live trading needs a broker integration and none is built in. \
         Use `trading paper` for simulated trading or `trading backtest` for historical replay"
    )
}
