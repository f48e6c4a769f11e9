//! Seeded random-walk market data for paper sessions.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use trading_core::error::DataError;
use trading_core::traits::{MarketDataProvider, Tick};
use trading_core::types::{Bar, Timeframe};

/// Parameters of the simulated feed.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub seed: u64,
    pub start_price: f64,
    /// Maximum relative move per bar
    pub volatility: f64,
    pub spread: f64,
    pub timeframe: Timeframe,
    /// Open time of the first generated bar, Unix ms
    pub start_timestamp: i64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start_price: 1.1000,
            volatility: 0.001,
            spread: 0.0002,
            timeframe: Timeframe::Minute5,
            start_timestamp: 1_704_067_200_000,
        }
    }
}

struct SymbolWalk {
    rng: StdRng,
    bars: Vec<Bar>,
    next_timestamp: i64,
}

/// Random-walk provider. The first `latest_bars` call for a symbol produces
/// `count` bars of history; every later call closes exactly one new bar.
pub struct SimulatedMarketData {
    config: SimulationConfig,
    walks: Mutex<HashMap<String, SymbolWalk>>,
    available: AtomicBool,
}

impl SimulatedMarketData {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            walks: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate a feed outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DataError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DataError::Unavailable("simulated feed offline".into()))
        }
    }

    fn seed_for(&self, symbol: &str) -> u64 {
        // FNV-1a over the symbol keeps walks independent of call order
        let hash = symbol
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100_0000_01b3));
        self.config.seed ^ hash
    }

    fn next_bar(&self, walk: &mut SymbolWalk) -> Bar {
        let vol = self.config.volatility;
        let open = walk.bars.last().map(|b| b.close).unwrap_or(self.config.start_price);
        let close = (open * (1.0 + walk.rng.gen_range(-vol..=vol))).max(f64::EPSILON);
        let high = open.max(close) * (1.0 + walk.rng.gen_range(0.0..=vol / 2.0));
        let low = open.min(close) * (1.0 - walk.rng.gen_range(0.0..=vol / 2.0));
        let volume = walk.rng.gen_range(100.0..1000.0f64).round();

        let bar = Bar::new(walk.next_timestamp, open, high, low, close, volume);
        walk.next_timestamp += self.config.timeframe.as_millis();
        bar
    }
}

#[async_trait]
impl MarketDataProvider for SimulatedMarketData {
    async fn latest_bars(&self, symbol: &str, count: usize) -> Result<Vec<Bar>, DataError> {
        self.check_available()?;

        let mut walks = self.walks.lock().await;
        if let Some(walk) = walks.get_mut(symbol) {
            let bar = self.next_bar(walk);
            walk.bars.push(bar);
        } else {
            let mut walk = SymbolWalk {
                rng: StdRng::seed_from_u64(self.seed_for(symbol)),
                bars: Vec::with_capacity(count),
                next_timestamp: self.config.start_timestamp,
            };
            for _ in 0..count.max(1) {
                let bar = self.next_bar(&mut walk);
                walk.bars.push(bar);
            }
            walks.insert(symbol.to_string(), walk);
        }

        let walk = walks
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;
        let start = walk.bars.len().saturating_sub(count);
        Ok(walk.bars[start..].to_vec())
    }

    async fn latest_tick(&self, symbol: &str) -> Result<Tick, DataError> {
        self.check_available()?;

        let walks = self.walks.lock().await;
        let bar = walks
            .get(symbol)
            .and_then(|w| w.bars.last())
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;
        let half = self.config.spread / 2.0;
        Ok(Tick {
            bid: bar.close - half,
            ask: bar.close + half,
            timestamp: bar.timestamp,
        })
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_warmup_then_one_bar_per_call() {
        let feed = SimulatedMarketData::new(SimulationConfig::default());

        let history = feed.latest_bars("EURUSD", 50).await.unwrap();
        assert_eq!(history.len(), 50);
        assert!(history.windows(2).all(|w| w[1].timestamp - w[0].timestamp == 300_000));
        assert!(history.iter().all(|b| b.low <= b.open.min(b.close) && b.high >= b.open.max(b.close)));

        let next = feed.latest_bars("EURUSD", 1).await.unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].timestamp, history[49].timestamp + 300_000);
        assert_eq!(next[0].open, history[49].close);
    }

    #[tokio::test]
    async fn test_same_seed_same_walk() {
        let a = SimulatedMarketData::new(SimulationConfig::default());
        let b = SimulatedMarketData::new(SimulationConfig::default());

        // different call order across symbols must not matter
        a.latest_bars("GBPUSD", 5).await.unwrap();
        let from_a = a.latest_bars("EURUSD", 20).await.unwrap();
        let from_b = b.latest_bars("EURUSD", 20).await.unwrap();
        assert_eq!(from_a, from_b);
    }

    #[tokio::test]
    async fn test_outage_and_tick() {
        let feed = SimulatedMarketData::new(SimulationConfig::default());
        assert!(matches!(
            feed.latest_tick("EURUSD").await,
            Err(DataError::SymbolNotFound(_))
        ));

        let bars = feed.latest_bars("EURUSD", 3).await.unwrap();
        let tick = feed.latest_tick("EURUSD").await.unwrap();
        assert!((tick.mid() - bars[2].close).abs() < 1e-12);

        feed.set_available(false);
        let err = feed.latest_bars("EURUSD", 1).await.unwrap_err();
        assert!(err.is_transient());
    }
}
