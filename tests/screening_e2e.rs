use algoscreen::domain::entities::candle::{Candle, Timeframe};
use algoscreen::domain::entities::filter::FilterRequest;
use algoscreen::domain::errors::{MarketDataError, ScreeningError};
use algoscreen::domain::repositories::market_data_client::{MarketDataClient, MarketDataResult};
use algoscreen::domain::services::screening::ScreeningService;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// In-memory exchange with an in-flight counter on candle fetches
struct MockExchange {
    symbols: Vec<String>,
    failing: HashSet<String>,
    latency: Duration,
    metadata_error: Option<MarketDataError>,
    ticker_error: Option<MarketDataError>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    metadata_calls: AtomicUsize,
    candle_calls: AtomicUsize,
}

impl MockExchange {
    fn with_symbols(count: usize) -> Self {
        MockExchange {
            symbols: (0..count).map(|i| format!("COIN{}USDT", i)).collect(),
            failing: HashSet::new(),
            latency: Duration::from_millis(5),
            metadata_error: None,
            ticker_error: None,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            metadata_calls: AtomicUsize::new(0),
            candle_calls: AtomicUsize::new(0),
        }
    }

    fn failing(mut self, symbols: &[&str]) -> Self {
        self.failing = symbols.iter().map(|s| s.to_string()).collect();
        self
    }

    fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn index_of(&self, symbol: &str) -> usize {
        self.symbols.iter().position(|s| s == symbol).unwrap_or(0)
    }

    /// A distinct, deterministic close path per symbol
    fn closes_for(&self, symbol: &str, limit: usize) -> Vec<f64> {
        let i = self.index_of(symbol);
        let drift = (i % 7) as f64 - 3.0;
        (0..limit)
            .map(|t| 100.0 + t as f64 * drift * 0.1 + ((t * (i + 3)) % 5) as f64)
            .collect()
    }
}

#[async_trait]
impl MarketDataClient for MockExchange {
    async fn fetch_symbol_metadata(&self) -> MarketDataResult<Value> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref error) = self.metadata_error {
            return Err(error.clone());
        }

        let mut symbols: Vec<Value> = self
            .symbols
            .iter()
            .map(|s| json!({ "symbol": s, "status": "TRADING", "quoteAsset": "USDT", "isSpotTradingAllowed": true }))
            .collect();
        symbols.push(json!({ "symbol": "ETHBTC", "status": "TRADING", "quoteAsset": "BTC", "isSpotTradingAllowed": true }));
        symbols.push(json!({ "symbol": "HALTUSDT", "status": "HALT", "quoteAsset": "USDT", "isSpotTradingAllowed": true }));
        symbols.push(json!({ "symbol": "NOVOLUSDT", "status": "TRADING", "quoteAsset": "USDT" }));

        Ok(json!({ "timezone": "UTC", "symbols": symbols }))
    }

    async fn fetch_volume_snapshot(&self) -> MarketDataResult<Value> {
        if let Some(ref error) = self.ticker_error {
            return Err(error.clone());
        }

        let mut tickers: Vec<Value> = self
            .symbols
            .iter()
            .enumerate()
            .map(|(i, s)| json!({ "symbol": s, "quoteVolume": format!("{}", (i + 1) * 1_000), "lastPrice": "1.5" }))
            .collect();
        tickers.push(json!({ "symbol": "ETHBTC", "quoteVolume": "99999" }));
        tickers.push(json!({ "symbol": "HALTUSDT", "quoteVolume": "99999" }));
        Ok(Value::Array(tickers))
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        limit: usize,
    ) -> MarketDataResult<Vec<Candle>> {
        self.candle_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(symbol) {
            return Err(MarketDataError::Timeout);
        }

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Ok(self
            .closes_for(symbol, limit)
            .into_iter()
            .enumerate()
            .map(|(t, close)| Candle {
                open_time: start + chrono::Duration::hours(t as i64),
                open: close,
                high: close,
                low: close,
                close,
            })
            .collect())
    }
}

#[tokio::test]
async fn test_concurrency_never_exceeds_twelve() {
    let exchange = Arc::new(MockExchange::with_symbols(50).latency(Duration::from_millis(20)));
    let service = ScreeningService::with_defaults(exchange.clone());

    let results = service
        .screen_by_rsi(Timeframe::OneHour, 12, 0.0, 100.0)
        .await;

    assert!(results.is_ok());
    let peak = exchange.peak_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 12, "observed {} concurrent fetches", peak);
    assert!(peak > 1, "fetches should overlap");
    assert_eq!(exchange.candle_calls.load(Ordering::SeqCst), 50);
}

#[tokio::test]
async fn test_batch_latency_is_bounded_by_waves() {
    // 50 symbols at 40ms each: ~5 waves of 12 instead of 50 sequential calls.
    let exchange = Arc::new(MockExchange::with_symbols(50).latency(Duration::from_millis(40)));
    let service = ScreeningService::with_defaults(exchange);

    let started = Instant::now();
    service
        .screen_by_ema(Timeframe::OneHour, 7, true)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(1_000));
}

#[tokio::test]
async fn test_partial_failures_do_not_abort_batch() {
    let failing = ["COIN3USDT", "COIN10USDT", "COIN21USDT", "COIN33USDT", "COIN49USDT"];
    let exchange = Arc::new(MockExchange::with_symbols(50).failing(&failing));
    let service = ScreeningService::with_defaults(exchange);

    let results = service
        .screen_by_rsi(Timeframe::FourHours, 6, 0.0, 100.0)
        .await
        .unwrap();

    assert_eq!(results.len(), 45);
    assert!(results.iter().all(|r| !failing.contains(&r.symbol.as_str())));
}

#[tokio::test]
async fn test_unsupported_rsi_period_fails_before_fetching() {
    let exchange = Arc::new(MockExchange::with_symbols(10));
    let service = ScreeningService::with_defaults(exchange.clone());

    let result = service
        .screen_by_rsi(Timeframe::OneDay, 10, 0.0, 30.0)
        .await;

    assert!(matches!(result, Err(ScreeningError::InvalidConfiguration(_))));
    assert_eq!(exchange.metadata_calls.load(Ordering::SeqCst), 0);
    assert_eq!(exchange.candle_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_default_period_fourteen_is_rejected() {
    let exchange = Arc::new(MockExchange::with_symbols(3));
    let service = ScreeningService::with_defaults(exchange.clone());

    let request = FilterRequest::Rsi {
        timeframe: Timeframe::OneHour,
        rsi_period: 14,
        rsi_min: 0.0,
        rsi_max: 100.0,
    };

    assert!(matches!(
        service.screen(&request).await,
        Err(ScreeningError::InvalidConfiguration(_))
    ));
    assert_eq!(exchange.candle_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_metadata_failure_is_fatal_and_verbatim() {
    let mut exchange = MockExchange::with_symbols(5);
    exchange.metadata_error = Some(MarketDataError::Http {
        status: 418,
        body: "I'm a teapot".to_string(),
    });
    let exchange = Arc::new(exchange);
    let service = ScreeningService::with_defaults(exchange.clone());

    let result = service.screen_by_ema(Timeframe::OneHour, 25, true).await;

    assert_eq!(
        result,
        Err(ScreeningError::UniverseUnavailable(MarketDataError::Http {
            status: 418,
            body: "I'm a teapot".to_string(),
        }))
    );
    assert_eq!(exchange.candle_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ticker_failure_is_fatal() {
    let mut exchange = MockExchange::with_symbols(5);
    exchange.ticker_error = Some(MarketDataError::Timeout);
    let service = ScreeningService::with_defaults(Arc::new(exchange));

    let result = service.screen_by_volume(0.0, f64::MAX).await;
    assert_eq!(
        result,
        Err(ScreeningError::UniverseUnavailable(MarketDataError::Timeout))
    );
}

#[tokio::test]
async fn test_volume_rule_skips_candle_fetches() {
    let exchange = Arc::new(MockExchange::with_symbols(20));
    let service = ScreeningService::with_defaults(exchange.clone());

    // Volumes are 1000, 2000, ... 20000.
    let results = service.screen_by_volume(5_000.0, 8_000.0).await.unwrap();

    let symbols: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["COIN7USDT", "COIN6USDT", "COIN5USDT", "COIN4USDT"]);
    assert!(results.iter().all(|r| r.close == 1.5 && r.rsi.is_none() && r.ema.is_none()));
    assert_eq!(exchange.candle_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ineligible_symbols_never_fetched() {
    let exchange = Arc::new(MockExchange::with_symbols(4));
    let service = ScreeningService::with_defaults(exchange.clone());

    let results = service.screen_by_volume(0.0, f64::MAX).await.unwrap();

    assert_eq!(results.len(), 4);
    assert!(results
        .iter()
        .all(|r| !["ETHBTC", "HALTUSDT", "NOVOLUSDT"].contains(&r.symbol.as_str())));

    service
        .screen_by_ema(Timeframe::OneHour, 7, false)
        .await
        .unwrap();
    assert_eq!(exchange.candle_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_rsi_results_sorted_ascending() {
    let service = ScreeningService::with_defaults(Arc::new(MockExchange::with_symbols(30)));

    let results = service
        .screen_by_rsi(Timeframe::OneHour, 24, 0.0, 100.0)
        .await
        .unwrap();

    assert!(!results.is_empty());
    for pair in results.windows(2) {
        assert!(pair[0].rsi.unwrap() <= pair[1].rsi.unwrap());
    }
    assert!(results
        .iter()
        .all(|r| (0.0..=100.0).contains(&r.rsi.unwrap()) && r.ema.is_none()));
}

#[tokio::test]
async fn test_rsi_bounds_filter_results() {
    let service = ScreeningService::with_defaults(Arc::new(MockExchange::with_symbols(30)));

    let all = service
        .screen_by_rsi(Timeframe::OneHour, 12, 0.0, 100.0)
        .await
        .unwrap();
    let oversold = service
        .screen_by_rsi(Timeframe::OneHour, 12, 0.0, 40.0)
        .await
        .unwrap();

    assert!(oversold.len() <= all.len());
    assert!(oversold.iter().all(|r| r.rsi.unwrap() <= 40.0));
}

#[tokio::test]
async fn test_ema_results_sorted_by_distance() {
    let service = ScreeningService::with_defaults(Arc::new(MockExchange::with_symbols(30)));

    for above in [true, false] {
        let results = service
            .screen_by_ema(Timeframe::OneHour, 25, above)
            .await
            .unwrap();

        assert!(!results.is_empty());
        for pair in results.windows(2) {
            let first = pair[0].close - pair[0].ema.unwrap();
            let second = pair[1].close - pair[1].ema.unwrap();
            assert!(first >= second);
        }
        for result in &results {
            let ema = result.ema.unwrap();
            if above {
                assert!(result.close > ema);
            } else {
                assert!(result.close < ema);
            }
        }
    }
}

#[tokio::test]
async fn test_volume_results_sorted_descending() {
    let service = ScreeningService::with_defaults(Arc::new(MockExchange::with_symbols(25)));

    let results = service
        .screen(&FilterRequest::Volume {
            min_volume: 0.0,
            max_volume: 1_000_000.0,
        })
        .await
        .unwrap();

    assert_eq!(results.len(), 25);
    for pair in results.windows(2) {
        assert!(pair[0].quote_volume_24h >= pair[1].quote_volume_24h);
    }
}

#[tokio::test]
async fn test_custom_lookback_is_forwarded() {
    let exchange = Arc::new(MockExchange::with_symbols(3));
    let service = ScreeningService::new(exchange, 2, 10);

    // Only 10 closes: EMA(25) is undefined for every symbol.
    let results = service
        .screen_by_ema(Timeframe::OneHour, 25, true)
        .await
        .unwrap();
    assert!(results.is_empty());

    let results = service
        .screen_by_ema(Timeframe::OneHour, 7, true)
        .await
        .unwrap();
    assert!(results.len() <= 3);
}
