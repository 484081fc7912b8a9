use std::time::Duration;

use crate::domain::services::fetch_scheduler::{DEFAULT_LOOKBACK, DEFAULT_MAX_IN_FLIGHT};
use crate::infrastructure::binance_client::{BinanceConfig, BINANCE_API_BASE, MAX_KLINES_LIMIT};

/// Runtime configuration for the screener service
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    pub binance_base_url: String,
    pub metadata_timeout_seconds: u64,
    pub ticker_timeout_seconds: u64,
    pub klines_timeout_seconds: u64,
    pub max_concurrent_fetches: usize, // Symbols processed at once per screening run
    pub lookback: usize,               // Candles requested per symbol
    pub server_host: String,
    pub server_port: u16,
    pub requests_per_minute: u32,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        ScreenerConfig {
            binance_base_url: BINANCE_API_BASE.to_string(),
            metadata_timeout_seconds: 20,
            ticker_timeout_seconds: 25,
            klines_timeout_seconds: 25,
            max_concurrent_fetches: DEFAULT_MAX_IN_FLIGHT,
            lookback: DEFAULT_LOOKBACK,
            server_host: "0.0.0.0".to_string(),
            server_port: 8001,
            requests_per_minute: 60,
        }
    }
}

impl ScreenerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ScreenerConfig {
        let mut config = ScreenerConfig::default();

        if let Ok(base_url) = std::env::var("BINANCE_BASE_URL") {
            if base_url.starts_with("http://") || base_url.starts_with("https://") {
                config.binance_base_url = base_url;
            } else {
                tracing::warn!(
                    "Invalid BINANCE_BASE_URL '{}' (must be http or https), using default: {}",
                    base_url,
                    config.binance_base_url
                );
            }
        }

        if let Some(value) = parse_in_range("BINANCE_METADATA_TIMEOUT_SECONDS", 1..=120) {
            config.metadata_timeout_seconds = value;
        }

        if let Some(value) = parse_in_range("BINANCE_TICKER_TIMEOUT_SECONDS", 1..=120) {
            config.ticker_timeout_seconds = value;
        }

        if let Some(value) = parse_in_range("BINANCE_KLINES_TIMEOUT_SECONDS", 1..=120) {
            config.klines_timeout_seconds = value;
        }

        if let Some(value) = parse_in_range("SCREENER_MAX_CONCURRENT_FETCHES", 1..=64) {
            config.max_concurrent_fetches = value;
        }

        if let Some(value) = parse_in_range("SCREENER_LOOKBACK", 2..=MAX_KLINES_LIMIT) {
            config.lookback = value;
        }

        if let Ok(host) = std::env::var("SERVER_HOST") {
            if !host.trim().is_empty() {
                config.server_host = host;
            }
        }

        if let Some(value) = parse_in_range("SERVER_PORT", 1..=u16::MAX) {
            config.server_port = value;
        }

        if let Some(value) = parse_in_range("RATE_LIMIT_REQUESTS_PER_MINUTE", 1..=10_000) {
            config.requests_per_minute = value;
        }

        config
    }

    pub fn binance_config(&self) -> BinanceConfig {
        BinanceConfig {
            api_base: self.binance_base_url.clone(),
            metadata_timeout: Duration::from_secs(self.metadata_timeout_seconds),
            ticker_timeout: Duration::from_secs(self.ticker_timeout_seconds),
            klines_timeout: Duration::from_secs(self.klines_timeout_seconds),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Reads `key` and keeps it only when it parses and falls inside `range`
fn parse_in_range<T>(key: &str, range: std::ops::RangeInclusive<T>) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) if range.contains(&value) => Some(value),
        Ok(value) => {
            tracing::warn!(
                "Invalid {} value: {} (must be between {} and {}), using default",
                key,
                value,
                range.start(),
                range.end()
            );
            None
        }
        Err(e) => {
            tracing::warn!("Failed to parse {} '{}': {}, using default", key, raw, e);
            None
        }
    }
}
