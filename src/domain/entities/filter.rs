use serde::{Deserialize, Serialize};

use crate::domain::entities::candle::Timeframe;
use crate::domain::entities::screen_result::ScreenResult;
use crate::domain::errors::ScreeningError;
use crate::domain::services::indicators::RsiPeriod;

/// EMA periods the request layer accepts
pub const ACCEPTED_EMA_PERIODS: [usize; 3] = [7, 25, 99];

fn default_ema_above() -> bool {
    true
}

/// A screening request; each rule carries only its own parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterRequest {
    Volume {
        #[serde(rename = "minVolume")]
        min_volume: f64,
        #[serde(rename = "maxVolume")]
        max_volume: f64,
    },
    Ema {
        timeframe: Timeframe,
        #[serde(rename = "emaPeriod")]
        ema_period: usize,
        #[serde(rename = "emaAbove", default = "default_ema_above")]
        ema_above: bool,
    },
    Rsi {
        timeframe: Timeframe,
        #[serde(rename = "rsiPeriod")]
        rsi_period: usize,
        #[serde(rename = "rsiMin")]
        rsi_min: f64,
        #[serde(rename = "rsiMax")]
        rsi_max: f64,
    },
}

impl FilterRequest {
    pub fn rule_name(&self) -> &'static str {
        match self {
            FilterRequest::Volume { .. } => "volume",
            FilterRequest::Ema { .. } => "ema",
            FilterRequest::Rsi { .. } => "rsi",
        }
    }

    /// Checks parameter sets and bounds before any market data is requested
    pub fn validate(&self) -> Result<(), ScreeningError> {
        match self {
            FilterRequest::Volume {
                min_volume,
                max_volume,
            } => validate_range("volume", *min_volume, *max_volume),
            FilterRequest::Ema { ema_period, .. } => {
                if ACCEPTED_EMA_PERIODS.contains(ema_period) {
                    Ok(())
                } else {
                    Err(ScreeningError::InvalidConfiguration(format!(
                        "EMA period must be one of {:?}, got {}",
                        ACCEPTED_EMA_PERIODS, ema_period
                    )))
                }
            }
            FilterRequest::Rsi {
                rsi_period,
                rsi_min,
                rsi_max,
                ..
            } => {
                RsiPeriod::try_from(*rsi_period)?;
                validate_range("RSI", *rsi_min, *rsi_max)
            }
        }
    }
}

fn validate_range(name: &str, min: f64, max: f64) -> Result<(), ScreeningError> {
    if !min.is_finite() || !max.is_finite() {
        return Err(ScreeningError::InvalidConfiguration(format!(
            "{} bounds must be finite",
            name
        )));
    }
    if min > max {
        return Err(ScreeningError::InvalidConfiguration(format!(
            "{} minimum {} exceeds maximum {}",
            name, min, max
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterResponse {
    pub items: Vec<ScreenResult>,
}
