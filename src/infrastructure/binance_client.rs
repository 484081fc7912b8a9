use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::domain::entities::candle::{Candle, Timeframe};
use crate::domain::errors::MarketDataError;
use crate::domain::repositories::market_data_client::{MarketDataClient, MarketDataResult};

/// Binance public REST API
pub const BINANCE_API_BASE: &str = "https://api.binance.com";

/// Upper bound the klines endpoint accepts for `limit`
pub const MAX_KLINES_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub api_base: String,
    pub metadata_timeout: Duration,
    pub ticker_timeout: Duration,
    pub klines_timeout: Duration,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        BinanceConfig {
            api_base: BINANCE_API_BASE.to_string(),
            metadata_timeout: Duration::from_secs(20),
            ticker_timeout: Duration::from_secs(25),
            klines_timeout: Duration::from_secs(25),
        }
    }
}

/// Public market-data client; one connection pool for the process lifetime
pub struct BinanceClient {
    client: Client,
    config: BinanceConfig,
}

impl BinanceClient {
    pub fn new(mut config: BinanceConfig) -> Result<Self, MarketDataError> {
        config.api_base = config.api_base.trim_end_matches('/').to_string();
        let client = Client::builder()
            .user_agent(concat!("algoscreen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MarketDataError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn api_base(&self) -> &str {
        &self.config.api_base
    }

    async fn get_json(&self, request: RequestBuilder, timeout: Duration) -> MarketDataResult<Value> {
        let response = request.timeout(timeout).send().await.map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketDataError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout
            } else {
                MarketDataError::MalformedPayload(e.to_string())
            }
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> MarketDataError {
    if error.is_timeout() {
        MarketDataError::Timeout
    } else {
        MarketDataError::Network(error.to_string())
    }
}

#[async_trait]
impl MarketDataClient for BinanceClient {
    async fn fetch_symbol_metadata(&self) -> MarketDataResult<Value> {
        let url = format!("{}/api/v3/exchangeInfo", self.config.api_base);
        self.get_json(self.client.get(&url), self.config.metadata_timeout)
            .await
    }

    async fn fetch_volume_snapshot(&self) -> MarketDataResult<Value> {
        let url = format!("{}/api/v3/ticker/24hr", self.config.api_base);
        let ticker = self
            .get_json(self.client.get(&url), self.config.ticker_timeout)
            .await?;

        if !ticker.is_array() {
            return Err(MarketDataError::MalformedPayload(
                "24h ticker response is not an array".to_string(),
            ));
        }
        Ok(ticker)
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> MarketDataResult<Vec<Candle>> {
        let url = format!("{}/api/v3/klines", self.config.api_base);
        let limit = limit.clamp(1, MAX_KLINES_LIMIT);
        let request = self.client.get(&url).query(&[
            ("symbol", symbol.to_string()),
            ("interval", timeframe.as_str().to_string()),
            ("limit", limit.to_string()),
        ]);

        let payload = self.get_json(request, self.config.klines_timeout).await?;
        let candles = parse_klines(&payload)?;

        debug!(
            symbol = %symbol,
            timeframe = %timeframe,
            candles = candles.len(),
            "Fetched klines"
        );
        Ok(candles)
    }
}

/// Parses the klines array: `[openTime, open, high, low, close, ...]` per row
pub fn parse_klines(payload: &Value) -> MarketDataResult<Vec<Candle>> {
    let rows = payload
        .as_array()
        .ok_or_else(|| MarketDataError::MalformedPayload("klines response is not an array".to_string()))?;

    rows.iter().map(parse_kline_row).collect()
}

fn parse_kline_row(row: &Value) -> MarketDataResult<Candle> {
    let fields = row
        .as_array()
        .filter(|fields| fields.len() >= 5)
        .ok_or_else(|| MarketDataError::MalformedPayload(format!("invalid kline row: {}", row)))?;

    let open_time = fields[0]
        .as_i64()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .ok_or_else(|| MarketDataError::MalformedPayload(format!("invalid open time: {}", fields[0])))?;

    Ok(Candle {
        open_time,
        open: decimal_field(&fields[1])?,
        high: decimal_field(&fields[2])?,
        low: decimal_field(&fields[3])?,
        close: decimal_field(&fields[4])?,
    })
}

fn decimal_field(value: &Value) -> MarketDataResult<f64> {
    let parsed = match value {
        Value::String(text) => text.parse::<f64>().ok(),
        Value::Number(number) => number.as_f64(),
        _ => None,
    };

    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| MarketDataError::MalformedPayload(format!("invalid decimal: {}", value)))
}
