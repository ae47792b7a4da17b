use crate::error::ApiError;
use async_trait::async_trait;
use configuration::{DataConfig, Venue};
use core_types::Kline;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

pub mod binance;
pub mod error;
pub mod gateio;
pub mod interval;
pub mod kraken;
pub mod responses;
pub mod universe;

// --- Public API ---
pub use binance::BinanceSource;
pub use gateio::GateioSource;
pub use kraken::KrakenSource;
pub use universe::{CoinGeckoUniverse, UniverseSource};

/// The interface for one public market data backend.
///
/// Sources speak in base assets (`"BTC"`); each one resolves the asset to its
/// own trading pair and quote currency.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// The identifier recorded as a position's venue, e.g. `"binance"`.
    fn venue(&self) -> &str;

    /// The normalised pair this source trades for `base`, e.g. `"BTC/USDT"`.
    fn pair_for(&self, base: &str) -> String;

    /// Fetches up to `limit` of the most recent bars, oldest first.
    async fn fetch_klines(&self, base: &str, interval: &str, limit: usize) -> Result<Vec<Kline>, ApiError>;

    /// Fetches the last traded price.
    async fn fetch_last_price(&self, base: &str) -> Result<Decimal, ApiError>;
}

/// Bars for one symbol together with where they came from.
#[derive(Debug, Clone)]
pub struct SampledSeries {
    pub venue: String,
    pub pair: String,
    pub klines: Vec<Kline>,
}

/// A last-trade price and the venue that supplied it.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub venue: String,
    pub pair: String,
    pub price: Decimal,
}

/// Returns the base asset of a normalised pair (`"BTC/USDT"` -> `"BTC"`).
pub fn base_asset(pair: &str) -> &str {
    pair.split_once('/').map_or(pair, |(base, _)| base)
}

/// Builds the configured sources in fallback order, sharing one HTTP client.
pub fn build_sources(config: &DataConfig) -> Result<Vec<Arc<dyn MarketDataSource>>, ApiError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(concat!("sentinel/", env!("CARGO_PKG_VERSION")))
        .build()?;

    Ok(config
        .sources
        .iter()
        .map(|venue| -> Arc<dyn MarketDataSource> {
            match venue {
                Venue::Binance => Arc::new(BinanceSource::new(client.clone())),
                Venue::Kraken => Arc::new(KrakenSource::new(client.clone())),
                Venue::Gateio => Arc::new(GateioSource::new(client.clone())),
            }
        })
        .collect())
}

/// Samples series and prices across several sources tried in a fixed order.
///
/// Every call to a source is wrapped in its own timeout. A failing source is
/// logged and the next one is tried. Only when all of them fail does the caller
/// see an error, and then it is always `DataUnavailable` or `InsufficientHistory`.
#[derive(Clone)]
pub struct SeriesSampler {
    sources: Vec<Arc<dyn MarketDataSource>>,
    timeout: Duration,
}

impl SeriesSampler {
    pub fn new(sources: Vec<Arc<dyn MarketDataSource>>, timeout: Duration) -> Self {
        Self { sources, timeout }
    }

    pub fn venues(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.venue()).collect()
    }

    /// Fetches at least `min_bars` bars (requesting `limit`) from the first source that has them.
    pub async fn fetch(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
        min_bars: usize,
    ) -> Result<SampledSeries, ApiError> {
        let mut failures = Vec::new();
        let mut best_available: Option<usize> = None;

        for source in &self.sources {
            match self.timed(source.venue(), source.fetch_klines(symbol, interval, limit)).await {
                Ok(klines) if klines.len() >= min_bars => {
                    return Ok(SampledSeries {
                        venue: source.venue().to_string(),
                        pair: source.pair_for(symbol),
                        klines,
                    });
                }
                Ok(klines) => {
                    tracing::debug!(
                        venue = source.venue(),
                        symbol,
                        bars = klines.len(),
                        min_bars,
                        "Source returned too little history"
                    );
                    best_available = Some(best_available.unwrap_or(0).max(klines.len()));
                }
                Err(e) => {
                    tracing::debug!(venue = source.venue(), symbol, error = %e, "Source failed, trying next");
                    failures.push(format!("{}: {}", source.venue(), e));
                }
            }
        }

        match best_available {
            Some(available) => Err(ApiError::InsufficientHistory {
                symbol: symbol.to_string(),
                required: min_bars,
                available,
            }),
            None => Err(ApiError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: exhausted(failures),
            }),
        }
    }

    /// Fetches the last price, trying `preferred_venue` first when it is configured.
    pub async fn fetch_last_price(
        &self,
        symbol: &str,
        preferred_venue: Option<&str>,
    ) -> Result<Quote, ApiError> {
        let mut ordered: Vec<&Arc<dyn MarketDataSource>> = self.sources.iter().collect();
        if let Some(preferred) = preferred_venue {
            // Stable sort keeps the configured order for everything else.
            ordered.sort_by_key(|s| s.venue() != preferred);
        }

        let mut failures = Vec::new();
        for source in ordered {
            match self.timed(source.venue(), source.fetch_last_price(symbol)).await {
                Ok(price) if price > Decimal::ZERO => {
                    return Ok(Quote {
                        venue: source.venue().to_string(),
                        pair: source.pair_for(symbol),
                        price,
                    });
                }
                Ok(price) => failures.push(format!("{}: non-positive price {}", source.venue(), price)),
                Err(e) => {
                    tracing::debug!(venue = source.venue(), symbol, error = %e, "Ticker failed, trying next");
                    failures.push(format!("{}: {}", source.venue(), e));
                }
            }
        }

        Err(ApiError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: exhausted(failures),
        })
    }

    async fn timed<T>(
        &self,
        venue: &str,
        call: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ApiError::Timeout {
                venue: venue.to_string(),
                secs: self.timeout.as_secs(),
            })?
    }
}

fn exhausted(failures: Vec<String>) -> String {
    if failures.is_empty() {
        "no data sources configured".to_string()
    } else {
        failures.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        venue: &'static str,
        bars: Option<usize>,
        price: Option<Decimal>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(venue: &'static str, bars: Option<usize>, price: Option<Decimal>) -> Self {
            Self {
                venue,
                bars,
                price,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MarketDataSource for FakeSource {
        fn venue(&self) -> &str {
            self.venue
        }

        fn pair_for(&self, base: &str) -> String {
            format!("{base}/USDT")
        }

        async fn fetch_klines(&self, _base: &str, interval: &str, _limit: usize) -> Result<Vec<Kline>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let n = self
                .bars
                .ok_or_else(|| ApiError::ApiError(format!("{} is down", self.venue)))?;
            let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            Ok((0..n)
                .map(|_| Kline {
                    open_time: t,
                    open: dec!(1),
                    high: dec!(1),
                    low: dec!(1),
                    close: dec!(1),
                    volume: dec!(1),
                    close_time: t,
                    interval: interval.to_string(),
                })
                .collect())
        }

        async fn fetch_last_price(&self, _base: &str) -> Result<Decimal, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.price
                .ok_or_else(|| ApiError::ApiError(format!("{} is down", self.venue)))
        }
    }

    fn sampler(sources: Vec<Arc<FakeSource>>) -> SeriesSampler {
        let sources = sources
            .into_iter()
            .map(|s| s as Arc<dyn MarketDataSource>)
            .collect();
        SeriesSampler::new(sources, Duration::from_millis(200))
    }

    #[test]
    fn base_asset_splits_pairs() {
        assert_eq!(base_asset("BTC/USDT"), "BTC");
        assert_eq!(base_asset("ETH"), "ETH");
    }

    #[test]
    fn sources_follow_configured_order_and_venue_ids() {
        let config = DataConfig {
            sources: vec![Venue::Kraken, Venue::Gateio, Venue::Binance],
            ..DataConfig::default()
        };
        let sources = build_sources(&config).unwrap();
        let venues: Vec<&str> = sources.iter().map(|s| s.venue()).collect();
        assert_eq!(venues, vec!["kraken", "gateio", "binance"]);
        assert_eq!(venues[0], Venue::Kraken.id());
    }

    #[tokio::test]
    async fn falls_back_to_the_next_source() {
        let down = Arc::new(FakeSource::new("binance", None, None));
        let up = Arc::new(FakeSource::new("kraken", Some(100), None));
        let sampler = sampler(vec![down.clone(), up.clone()]);

        let series = sampler.fetch("SOL", "4h", 250, 64).await.unwrap();
        assert_eq!(series.venue, "kraken");
        assert_eq!(series.pair, "SOL/USDT");
        assert_eq!(series.klines.len(), 100);
        assert_eq!(down.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn first_successful_source_wins() {
        let first = Arc::new(FakeSource::new("binance", Some(250), None));
        let second = Arc::new(FakeSource::new("kraken", Some(250), None));
        let sampler = sampler(vec![first, second.clone()]);

        let series = sampler.fetch("BTC", "4h", 250, 64).await.unwrap();
        assert_eq!(series.venue, "binance");
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_history_everywhere_is_insufficient_history() {
        let sampler = sampler(vec![
            Arc::new(FakeSource::new("binance", Some(20), None)),
            Arc::new(FakeSource::new("kraken", None, None)),
            Arc::new(FakeSource::new("gateio", Some(30), None)),
        ]);

        match sampler.fetch("NEW", "4h", 250, 64).await {
            Err(ApiError::InsufficientHistory { required, available, .. }) => {
                assert_eq!(required, 64);
                assert_eq!(available, 30);
            }
            other => panic!("expected InsufficientHistory, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn all_sources_down_is_data_unavailable() {
        let sampler = sampler(vec![
            Arc::new(FakeSource::new("binance", None, None)),
            Arc::new(FakeSource::new("kraken", None, None)),
        ]);
        let err = sampler.fetch("BTC", "4h", 250, 64).await.unwrap_err();
        assert!(matches!(err, ApiError::DataUnavailable { .. }));
        assert!(err.is_skippable());
    }

    #[tokio::test]
    async fn slow_source_times_out_and_falls_back() {
        let mut slow = FakeSource::new("binance", Some(250), None);
        slow.delay = Some(Duration::from_secs(5));
        let sampler = sampler(vec![
            Arc::new(slow),
            Arc::new(FakeSource::new("kraken", Some(250), None)),
        ]);

        let series = sampler.fetch("BTC", "4h", 250, 64).await.unwrap();
        assert_eq!(series.venue, "kraken");
    }

    #[tokio::test]
    async fn preferred_venue_is_asked_first_for_prices() {
        let binance = Arc::new(FakeSource::new("binance", None, Some(dec!(101))));
        let kraken = Arc::new(FakeSource::new("kraken", None, Some(dec!(100))));
        let sampler = sampler(vec![binance.clone(), kraken.clone()]);

        let quote = sampler.fetch_last_price("BTC", Some("kraken")).await.unwrap();
        assert_eq!(quote.venue, "kraken");
        assert_eq!(quote.price, dec!(100));
        assert_eq!(binance.calls.load(Ordering::SeqCst), 0);

        let quote = sampler.fetch_last_price("BTC", None).await.unwrap();
        assert_eq!(quote.venue, "binance");
    }

    #[tokio::test]
    async fn zero_price_is_not_accepted() {
        let sampler = sampler(vec![Arc::new(FakeSource::new("binance", None, Some(dec!(0))))]);
        assert!(matches!(
            sampler.fetch_last_price("BTC", None).await,
            Err(ApiError::DataUnavailable { .. })
        ));
    }
}
