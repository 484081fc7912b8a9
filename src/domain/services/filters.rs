use crate::domain::entities::candle::CandleSeries;
use crate::domain::entities::market::{SymbolUniverse, VolumeSnapshot};
use crate::domain::entities::screen_result::ScreenResult;
use crate::domain::errors::IndicatorError;
use crate::domain::services::indicators::{ema_last, rsi_wilder_last, RsiPeriod};

/// A rule that scores symbols from their candle series
pub trait CandleFilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the result row when the series passes the rule
    fn evaluate(&self, series: &CandleSeries, quote_volume_24h: f64) -> Option<ScreenResult>;

    /// Orders passing rows by the rule's ranking key
    fn rank(&self, results: &mut [ScreenResult]);
}

/// Inclusive 24h quote-volume range, ranked by volume descending
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeFilter {
    pub min: f64,
    pub max: f64,
}

impl VolumeFilter {
    pub fn new(min: f64, max: f64) -> Self {
        VolumeFilter { min, max }
    }

    pub fn matches(&self, volume: f64) -> bool {
        self.min <= volume && volume <= self.max
    }

    /// Volume needs no candles: every universe symbol is checked against the snapshot
    pub fn apply(&self, universe: &SymbolUniverse, volumes: &VolumeSnapshot) -> Vec<ScreenResult> {
        let mut results: Vec<ScreenResult> = universe
            .symbols()
            .iter()
            .filter_map(|symbol| {
                let volume = volumes.volume(symbol);
                self.matches(volume).then(|| ScreenResult {
                    symbol: symbol.clone(),
                    close: volumes.last_price(symbol).unwrap_or(0.0),
                    quote_volume_24h: volume,
                    rsi: None,
                    ema: None,
                })
            })
            .collect();

        results.sort_by(|a, b| b.quote_volume_24h.total_cmp(&a.quote_volume_24h));
        results
    }
}

/// Last close strictly above (or below) its EMA, ranked by `close - ema` descending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaTrendFilter {
    pub period: usize,
    pub above: bool,
}

impl EmaTrendFilter {
    pub fn new(period: usize, above: bool) -> Self {
        EmaTrendFilter { period, above }
    }
}

impl CandleFilter for EmaTrendFilter {
    fn name(&self) -> &'static str {
        "ema"
    }

    fn evaluate(&self, series: &CandleSeries, quote_volume_24h: f64) -> Option<ScreenResult> {
        let ema = ema_last(&series.closes, self.period)?;
        let close = series.last_close()?;

        // Equality fails in both directions.
        let passes = if self.above { close > ema } else { close < ema };
        passes.then(|| ScreenResult {
            symbol: series.symbol.clone(),
            close,
            quote_volume_24h,
            rsi: None,
            ema: Some(ema),
        })
    }

    fn rank(&self, results: &mut [ScreenResult]) {
        results.sort_by(|a, b| {
            let a = a.ema_distance().unwrap_or(0.0);
            let b = b.ema_distance().unwrap_or(0.0);
            b.total_cmp(&a)
        });
    }
}

/// Inclusive Wilder RSI range, ranked by RSI ascending
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiRangeFilter {
    period: RsiPeriod,
    pub min: f64,
    pub max: f64,
}

impl RsiRangeFilter {
    /// Fails for any period outside 6, 12 and 24
    pub fn new(period: usize, min: f64, max: f64) -> Result<Self, IndicatorError> {
        Ok(RsiRangeFilter {
            period: RsiPeriod::try_from(period)?,
            min,
            max,
        })
    }

    pub fn period(&self) -> RsiPeriod {
        self.period
    }
}

impl CandleFilter for RsiRangeFilter {
    fn name(&self) -> &'static str {
        "rsi"
    }

    fn evaluate(&self, series: &CandleSeries, quote_volume_24h: f64) -> Option<ScreenResult> {
        let rsi = rsi_wilder_last(&series.closes, self.period.value()).ok()??;
        if !(self.min <= rsi && rsi <= self.max) {
            return None;
        }

        Some(ScreenResult {
            symbol: series.symbol.clone(),
            close: series.last_close()?,
            quote_volume_24h,
            rsi: Some(rsi),
            ema: None,
        })
    }

    fn rank(&self, results: &mut [ScreenResult]) {
        results.sort_by(|a, b| {
            let a = a.rsi.unwrap_or(f64::MAX);
            let b = b.rsi.unwrap_or(f64::MAX);
            a.total_cmp(&b)
        });
    }
}
