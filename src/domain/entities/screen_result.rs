use serde::{Deserialize, Serialize};

/// One symbol that passed a filter rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenResult {
    pub symbol: String,
    pub close: f64,
    #[serde(rename = "quoteVolume24h")]
    pub quote_volume_24h: f64,
    pub rsi: Option<f64>,
    pub ema: Option<f64>,
}

impl ScreenResult {
    /// Distance of the close above (positive) or below its EMA
    pub fn ema_distance(&self) -> Option<f64> {
        self.ema.map(|ema| self.close - ema)
    }
}
