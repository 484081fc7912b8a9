use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::domain::entities::candle::{CandleSeries, Timeframe};
use crate::domain::entities::filter::FilterRequest;
use crate::domain::entities::market::{SymbolUniverse, VolumeSnapshot};
use crate::domain::entities::screen_result::ScreenResult;
use crate::domain::errors::ScreeningError;
use crate::domain::repositories::market_data_client::MarketDataClient;
use crate::domain::services::fetch_scheduler::{
    CandleFetchScheduler, DEFAULT_LOOKBACK, DEFAULT_MAX_IN_FLIGHT,
};
use crate::domain::services::filters::{CandleFilter, EmaTrendFilter, RsiRangeFilter, VolumeFilter};
use crate::domain::services::universe::resolve_universe;

pub type ScreeningResult<T> = Result<T, ScreeningError>;

/// Screens the exchange's USDT spot universe against one rule per call.
///
/// The market-data client is injected once and shared by every run.
pub struct ScreeningService {
    client: Arc<dyn MarketDataClient>,
    scheduler: CandleFetchScheduler,
    lookback: usize,
}

impl ScreeningService {
    pub fn new(client: Arc<dyn MarketDataClient>, max_in_flight: usize, lookback: usize) -> Self {
        ScreeningService {
            scheduler: CandleFetchScheduler::new(client.clone(), max_in_flight),
            client,
            lookback,
        }
    }

    pub fn with_defaults(client: Arc<dyn MarketDataClient>) -> Self {
        Self::new(client, DEFAULT_MAX_IN_FLIGHT, DEFAULT_LOOKBACK)
    }

    /// Validates and dispatches a request to its rule
    pub async fn screen(&self, request: &FilterRequest) -> ScreeningResult<Vec<ScreenResult>> {
        request.validate()?;

        match *request {
            FilterRequest::Volume {
                min_volume,
                max_volume,
            } => self.screen_by_volume(min_volume, max_volume).await,
            FilterRequest::Ema {
                timeframe,
                ema_period,
                ema_above,
            } => self.screen_by_ema(timeframe, ema_period, ema_above).await,
            FilterRequest::Rsi {
                timeframe,
                rsi_period,
                rsi_min,
                rsi_max,
            } => {
                self.screen_by_rsi(timeframe, rsi_period, rsi_min, rsi_max)
                    .await
            }
        }
    }

    /// Symbols whose 24h quote volume lies in `[min, max]`, highest volume first
    pub async fn screen_by_volume(&self, min: f64, max: f64) -> ScreeningResult<Vec<ScreenResult>> {
        let started = Instant::now();
        let (universe, volumes) = self.load_universe().await?;

        let results = VolumeFilter::new(min, max).apply(&universe, &volumes);

        info!(
            rule = "volume",
            universe_size = universe.len(),
            matched = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Screening completed"
        );
        Ok(results)
    }

    /// Symbols whose last close is strictly above (or below) EMA(`period`)
    pub async fn screen_by_ema(
        &self,
        timeframe: Timeframe,
        period: usize,
        above: bool,
    ) -> ScreeningResult<Vec<ScreenResult>> {
        if period == 0 {
            return Err(ScreeningError::InvalidConfiguration(
                "EMA period must be positive".to_string(),
            ));
        }
        self.screen_candles(Arc::new(EmaTrendFilter::new(period, above)), timeframe)
            .await
    }

    /// Symbols whose Wilder RSI(`period`) lies in `[min, max]`, lowest RSI first.
    ///
    /// `period` must be 6, 12 or 24; anything else fails before any request is made.
    pub async fn screen_by_rsi(
        &self,
        timeframe: Timeframe,
        period: usize,
        min: f64,
        max: f64,
    ) -> ScreeningResult<Vec<ScreenResult>> {
        let filter = RsiRangeFilter::new(period, min, max)?;
        self.screen_candles(Arc::new(filter), timeframe).await
    }

    async fn load_universe(&self) -> ScreeningResult<(SymbolUniverse, VolumeSnapshot)> {
        let exchange_info = self.client.fetch_symbol_metadata().await.map_err(|e| {
            error!(error = %e, "Failed to fetch symbol metadata");
            ScreeningError::UniverseUnavailable(e)
        })?;
        let ticker = self.client.fetch_volume_snapshot().await.map_err(|e| {
            error!(error = %e, "Failed to fetch 24h volume snapshot");
            ScreeningError::UniverseUnavailable(e)
        })?;

        Ok(resolve_universe(&exchange_info, &ticker))
    }

    async fn screen_candles(
        &self,
        filter: Arc<dyn CandleFilter>,
        timeframe: Timeframe,
    ) -> ScreeningResult<Vec<ScreenResult>> {
        let started = Instant::now();
        let (universe, volumes) = self.load_universe().await?;
        let volumes = Arc::new(volumes);

        let evaluator = {
            let filter = filter.clone();
            let volumes = volumes.clone();
            move |series: CandleSeries| {
                let volume = volumes.volume(&series.symbol);
                filter.evaluate(&series, volume)
            }
        };

        let outcomes = self
            .scheduler
            .fetch_with(universe.symbols(), timeframe, self.lookback, evaluator)
            .await;

        let fetched = outcomes.iter().filter(|o| o.result.is_ok()).count();
        let mut results: Vec<ScreenResult> = outcomes
            .into_iter()
            .filter_map(|outcome| outcome.result.ok().flatten())
            .collect();
        filter.rank(&mut results);

        info!(
            rule = filter.name(),
            timeframe = %timeframe,
            universe_size = universe.len(),
            fetched = fetched,
            matched = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Screening completed"
        );
        Ok(results)
    }
}
