//! Market Data Client Trait
//!
//! The screener talks to the exchange only through `MarketDataClient`. The
//! production implementation lives in `infrastructure::binance_client`; tests
//! substitute in-memory clients.
//!
//! Timeouts are the implementation's concern: a timed-out call simply
//! returns an error like any other transport failure.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::entities::candle::{Candle, Timeframe};
use crate::domain::errors::MarketDataError;

pub type MarketDataResult<T> = Result<T, MarketDataError>;

#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Raw exchange metadata (the `exchangeInfo` document)
    async fn fetch_symbol_metadata(&self) -> MarketDataResult<Value>;

    /// Raw 24h ticker statistics for every symbol
    async fn fetch_volume_snapshot(&self) -> MarketDataResult<Value>;

    /// Up to `limit` most recent candles for one symbol, oldest first
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> MarketDataResult<Vec<Candle>>;
}
