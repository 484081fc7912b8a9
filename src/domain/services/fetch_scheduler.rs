//! Bounded-concurrency candle fetching.
//!
//! Each symbol runs as its own spawned task. A task holds a semaphore permit
//! for its whole pipeline (fetch, then evaluate) so at most `max_in_flight`
//! symbols are being processed at once. Failures stay inside the task and come
//! back as an `Err` outcome tagged with the symbol.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::domain::entities::candle::{CandleSeries, Timeframe};
use crate::domain::errors::CandleFetchError;
use crate::domain::repositories::market_data_client::MarketDataClient;

/// Default cap on simultaneously processed symbols
pub const DEFAULT_MAX_IN_FLIGHT: usize = 12;

/// Default number of candles requested per symbol
pub const DEFAULT_LOOKBACK: usize = 200;

/// Result of one symbol's pipeline, paired with its symbol
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolOutcome<T> {
    pub symbol: String,
    pub result: Result<T, CandleFetchError>,
}

pub struct CandleFetchScheduler {
    client: Arc<dyn MarketDataClient>,
    max_in_flight: usize,
}

impl CandleFetchScheduler {
    pub fn new(client: Arc<dyn MarketDataClient>, max_in_flight: usize) -> Self {
        CandleFetchScheduler {
            client,
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Fetches one candle series per symbol.
    #[cfg(test)]
    pub async fn fetch_all(
        &self,
        symbols: &[String],
        timeframe: Timeframe,
        lookback: usize,
    ) -> Vec<SymbolOutcome<CandleSeries>> {
        self.fetch_with(symbols, timeframe, lookback, |series| series)
            .await
    }

    /// Fetches every symbol's candles and runs `evaluate` on each series while
    /// the task still holds its slot.
    ///
    /// Returns exactly one outcome per input symbol, in no particular order.
    pub async fn fetch_with<T, F>(
        &self,
        symbols: &[String],
        timeframe: Timeframe,
        lookback: usize,
        evaluate: F,
    ) -> Vec<SymbolOutcome<T>>
    where
        T: Send + 'static,
        F: Fn(CandleSeries) -> T + Send + Sync + 'static,
    {
        let started = Instant::now();
        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let evaluate = Arc::new(evaluate);

        let tasks: Vec<_> = symbols
            .iter()
            .map(|symbol| {
                let handle = tokio::spawn(run_pipeline(
                    self.client.clone(),
                    permits.clone(),
                    symbol.clone(),
                    timeframe,
                    lookback,
                    evaluate.clone(),
                ));
                (symbol.clone(), handle)
            })
            .collect();

        let (symbols, handles): (Vec<String>, Vec<_>) = tasks.into_iter().unzip();
        let joined = join_all(handles).await;

        let outcomes: Vec<SymbolOutcome<T>> = symbols
            .into_iter()
            .zip(joined)
            .map(|(symbol, joined)| {
                let result = match joined {
                    Ok(result) => result,
                    Err(e) => Err(CandleFetchError::TaskAborted(e.to_string())),
                };
                if let Err(ref reason) = result {
                    debug!(symbol = %symbol, reason = %reason, "Dropping symbol from batch");
                }
                SymbolOutcome { symbol, result }
            })
            .collect();

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(
            timeframe = %timeframe,
            symbols = outcomes.len(),
            failed = failed,
            max_in_flight = self.max_in_flight,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Candle batch completed"
        );

        outcomes
    }
}

/// Fetch and evaluate one symbol while holding a permit
async fn run_pipeline<T, F>(
    client: Arc<dyn MarketDataClient>,
    permits: Arc<Semaphore>,
    symbol: String,
    timeframe: Timeframe,
    lookback: usize,
    evaluate: Arc<F>,
) -> Result<T, CandleFetchError>
where
    F: Fn(CandleSeries) -> T,
{
    let _permit = permits
        .acquire_owned()
        .await
        .map_err(|e| CandleFetchError::TaskAborted(e.to_string()))?;

    let candles = client.fetch_candles(&symbol, timeframe, lookback).await?;
    if candles.is_empty() {
        return Err(CandleFetchError::EmptySeries);
    }

    let series = CandleSeries::from_candles(symbol, timeframe, &candles);
    Ok((*evaluate)(series))
}
