//! Where the runner gets its bars.
//!
//! [`HistoricalBarSource`] replays pre-loaded bars one timestamp per cycle.
//! [`PollingBarSource`] asks a [`MarketDataProvider`] for the newest closed
//! bar of every symbol, bounded by a timeout, with per-symbol backoff.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};
use trading_core::error::DataError;
use trading_core::traits::MarketDataProvider;
use trading_core::types::Bar;

/// Per-symbol outcome of one cycle: a new bar, nothing new, or a failure.
pub type CycleBars = Vec<(String, Result<Option<Bar>, DataError>)>;

#[async_trait]
pub trait BarSource: Send {
    /// Bars for the next cycle, in symbol order. `None` once exhausted.
    async fn next_cycle(&mut self) -> Option<CycleBars>;

    /// History to seed an engine with before trading.
    async fn warmup(&mut self, symbol: &str, count: usize) -> Result<Vec<Bar>, DataError>;

    /// Wait between cycles; `None` runs cycles back to back.
    fn poll_interval(&self) -> Option<Duration>;
}

/// Chronological replay of bars loaded up front.
#[derive(Debug)]
pub struct HistoricalBarSource {
    bars: BTreeMap<String, VecDeque<Bar>>,
}

impl HistoricalBarSource {
    /// Bars for each symbol are sorted by timestamp on construction.
    pub fn new(data: BTreeMap<String, Vec<Bar>>) -> Self {
        let bars = data
            .into_iter()
            .map(|(symbol, mut bars)| {
                bars.sort_by_key(|b| b.timestamp);
                (symbol, VecDeque::from(bars))
            })
            .collect();
        Self { bars }
    }

    pub fn remaining(&self) -> usize {
        self.bars.values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl BarSource for HistoricalBarSource {
    async fn next_cycle(&mut self) -> Option<CycleBars> {
        let next = self
            .bars
            .values()
            .filter_map(|q| q.front().map(|b| b.timestamp))
            .min()?;

        let cycle = self
            .bars
            .iter_mut()
            .filter(|(_, q)| q.front().is_some_and(|b| b.timestamp == next))
            .filter_map(|(symbol, q)| q.pop_front().map(|bar| (symbol.clone(), Ok(Some(bar)))))
            .collect();
        Some(cycle)
    }

    async fn warmup(&mut self, _symbol: &str, _count: usize) -> Result<Vec<Bar>, DataError> {
        Ok(Vec::new())
    }

    fn poll_interval(&self) -> Option<Duration> {
        None
    }
}

/// Timing for a polled feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSettings {
    pub poll_interval: Duration,
    /// Upper bound on a single provider call
    pub timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl FeedSettings {
    /// Delay after `failures` consecutive errors: doubles from the initial
    /// delay up to the maximum.
    pub fn backoff(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exp).min(self.max_backoff)
    }
}

#[derive(Debug, Default)]
struct FeedState {
    last_timestamp: Option<i64>,
    failures: u32,
    retry_at: Option<Instant>,
}

/// Live feed polled once per cycle.
pub struct PollingBarSource<P> {
    provider: P,
    symbols: Vec<String>,
    settings: FeedSettings,
    state: HashMap<String, FeedState>,
}

impl<P: MarketDataProvider> PollingBarSource<P> {
    pub fn new(provider: P, symbols: Vec<String>, settings: FeedSettings) -> Self {
        let mut symbols = symbols;
        symbols.sort();
        symbols.dedup();
        Self {
            provider,
            symbols,
            settings,
            state: HashMap::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn fetch(&self, symbol: &str, count: usize) -> Result<Vec<Bar>, DataError> {
        match timeout(self.settings.timeout, self.provider.latest_bars(symbol, count)).await {
            Ok(result) => result,
            Err(_) => Err(DataError::Timeout {
                symbol: symbol.to_string(),
                millis: self.settings.timeout.as_millis() as u64,
            }),
        }
    }

    async fn poll_symbol(&mut self, symbol: &str) -> Result<Option<Bar>, DataError> {
        let now = Instant::now();
        if let Some(retry_at) = self.state.get(symbol).and_then(|s| s.retry_at) {
            if now < retry_at {
                debug!(symbol, "Feed backing off, symbol skipped this cycle");
                return Ok(None);
            }
        }

        let result = self.fetch(symbol, 1).await;
        let state = self.state.entry(symbol.to_string()).or_default();
        match result {
            Ok(bars) => {
                state.failures = 0;
                state.retry_at = None;
                match bars.last() {
                    Some(bar) if state.last_timestamp.map_or(true, |ts| bar.timestamp > ts) => {
                        state.last_timestamp = Some(bar.timestamp);
                        Ok(Some(*bar))
                    }
                    _ => Ok(None),
                }
            }
            Err(e) => {
                state.failures += 1;
                let delay = self.settings.backoff(state.failures);
                state.retry_at = Some(now + delay);
                warn!(
                    symbol,
                    error = %e,
                    failures = state.failures,
                    backoff_ms = delay.as_millis() as u64,
                    transient = e.is_transient(),
                    "Feed request failed"
                );
                Err(e)
            }
        }
    }
}

#[async_trait]
impl<P: MarketDataProvider> BarSource for PollingBarSource<P> {
    async fn next_cycle(&mut self) -> Option<CycleBars> {
        let symbols = self.symbols.clone();
        let mut cycle = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let result = self.poll_symbol(&symbol).await;
            cycle.push((symbol, result));
        }
        Some(cycle)
    }

    async fn warmup(&mut self, symbol: &str, count: usize) -> Result<Vec<Bar>, DataError> {
        let bars = self.fetch(symbol, count).await?;
        if let Some(last) = bars.last() {
            self.state.entry(symbol.to_string()).or_default().last_timestamp = Some(last.timestamp);
        }
        debug!(symbol, bars = bars.len(), provider = self.provider.name(), "Warmup history fetched");
        Ok(bars)
    }

    fn poll_interval(&self) -> Option<Duration> {
        Some(self.settings.poll_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use trading_core::traits::Tick;
    use trading_data::{SimulatedMarketData, SimulationConfig};

    fn bars(symbol_offset: i64, timestamps: &[i64]) -> Vec<Bar> {
        timestamps
            .iter()
            .map(|&ts| Bar::flat(ts, 1.0 + symbol_offset as f64))
            .collect()
    }

    #[tokio::test]
    async fn test_historical_groups_by_timestamp() {
        let mut data = BTreeMap::new();
        data.insert("GBPUSD".to_string(), bars(1, &[2, 1]));
        data.insert("EURUSD".to_string(), bars(0, &[1, 3]));
        let mut source = HistoricalBarSource::new(data);
        assert_eq!(source.remaining(), 4);

        let first = source.next_cycle().await.unwrap();
        let symbols: Vec<_> = first.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(symbols, vec!["EURUSD", "GBPUSD"]);

        let second = source.next_cycle().await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].0, "GBPUSD");
        assert_eq!(second[0].1.as_ref().unwrap().unwrap().timestamp, 2);

        let third = source.next_cycle().await.unwrap();
        assert_eq!(third[0].0, "EURUSD");
        assert!(source.next_cycle().await.is_none());
        assert!(source.poll_interval().is_none());
    }

    /// Fails the first `failures` calls, then serves one fixed bar.
    struct Unreliable {
        failures: AtomicU32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl MarketDataProvider for Unreliable {
        async fn latest_bars(&self, symbol: &str, _count: usize) -> Result<Vec<Bar>, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(DataError::Unavailable(format!("{} feed down", symbol)));
            }
            Ok(vec![Bar::flat(1_000, 1.1)])
        }

        async fn latest_tick(&self, symbol: &str) -> Result<Tick, DataError> {
            Err(DataError::SymbolNotFound(symbol.into()))
        }

        fn name(&self) -> &str {
            "unreliable"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_backs_off_then_dedups() {
        let provider = Unreliable {
            failures: AtomicU32::new(2),
            calls: AtomicU32::new(0),
        };
        let settings = FeedSettings {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(2),
            ..Default::default()
        };
        let mut source = PollingBarSource::new(provider, vec!["EURUSD".into()], settings);

        let cycle = source.next_cycle().await.unwrap();
        assert!(cycle[0].1.as_ref().unwrap_err().is_transient());

        // Still inside the 1s backoff: no call made.
        let cycle = source.next_cycle().await.unwrap();
        assert!(matches!(cycle[0].1, Ok(None)));
        assert_eq!(source.provider().calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(1_100)).await;
        assert!(source.next_cycle().await.unwrap()[0].1.is_err());

        tokio::time::advance(Duration::from_millis(2_100)).await;
        let cycle = source.next_cycle().await.unwrap();
        assert_eq!(cycle[0].1.as_ref().unwrap().unwrap().timestamp, 1_000);

        // Same bar again is not new.
        let cycle = source.next_cycle().await.unwrap();
        assert!(matches!(cycle[0].1, Ok(None)));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let settings = FeedSettings {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            ..Default::default()
        };
        assert_eq!(settings.backoff(1), Duration::from_millis(100));
        assert_eq!(settings.backoff(2), Duration::from_millis(200));
        assert_eq!(settings.backoff(3), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_warmup_then_new_bars() {
        let feed = SimulatedMarketData::new(SimulationConfig::default());
        let mut source = PollingBarSource::new(
            feed,
            vec!["EURUSD".into(), "EURUSD".into()],
            FeedSettings::default(),
        );

        let history = source.warmup("EURUSD", 50).await.unwrap();
        assert_eq!(history.len(), 50);

        let cycle = source.next_cycle().await.unwrap();
        assert_eq!(cycle.len(), 1);
        let bar = cycle[0].1.as_ref().unwrap().unwrap();
        assert!(bar.timestamp > history[49].timestamp);
    }

    #[tokio::test]
    async fn test_offline_feed_is_transient() {
        let feed = SimulatedMarketData::new(SimulationConfig::default());
        feed.set_available(false);
        let mut source = PollingBarSource::new(feed, vec!["EURUSD".into()], FeedSettings::default());

        let cycle = source.next_cycle().await.unwrap();
        assert!(matches!(cycle[0].1, Err(DataError::Unavailable(_))));
    }

    struct Stalled;

    #[async_trait]
    impl MarketDataProvider for Stalled {
        async fn latest_bars(&self, _symbol: &str, _count: usize) -> Result<Vec<Bar>, DataError> {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
            Ok(Vec::new())
        }

        async fn latest_tick(&self, symbol: &str) -> Result<Tick, DataError> {
            Err(DataError::SymbolNotFound(symbol.into()))
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_provider_times_out() {
        let settings = FeedSettings {
            timeout: Duration::from_millis(250),
            ..Default::default()
        };
        let mut source = PollingBarSource::new(Stalled, vec!["EURUSD".into()], settings);

        let cycle = source.next_cycle().await.unwrap();
        match &cycle[0].1 {
            Err(DataError::Timeout { symbol, millis }) => {
                assert_eq!(symbol, "EURUSD");
                assert_eq!(*millis, 250);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
