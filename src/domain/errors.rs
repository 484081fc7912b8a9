use thiserror::Error;

/// Failures raised by the market-data transport
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarketDataError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Request timed out")]
    Timeout,
}

/// Why a single symbol produced no candle series.
///
/// These never leave the fetch scheduler: the symbol is simply dropped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CandleFetchError {
    #[error("Candle fetch failed: {0}")]
    Transport(#[from] MarketDataError),

    #[error("Exchange returned no candles")]
    EmptySeries,

    #[error("Fetch task aborted: {0}")]
    TaskAborted(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("RSI period must be 6, 12 or 24, got {0}")]
    UnsupportedRsiPeriod(usize),
}

/// Errors surfaced to the caller of a screening operation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScreeningError {
    /// Metadata or 24h ticker could not be fetched, so no universe exists
    #[error("Symbol universe unavailable: {0}")]
    UniverseUnavailable(MarketDataError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<IndicatorError> for ScreeningError {
    fn from(error: IndicatorError) -> Self {
        ScreeningError::InvalidConfiguration(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_error_carries_transport_message() {
        let error = ScreeningError::UniverseUnavailable(MarketDataError::Http {
            status: 418,
            body: "teapot".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Symbol universe unavailable: HTTP 418: teapot"
        );
    }

    #[test]
    fn test_indicator_error_becomes_invalid_configuration() {
        let error: ScreeningError = IndicatorError::UnsupportedRsiPeriod(14).into();
        assert_eq!(
            error,
            ScreeningError::InvalidConfiguration(
                "RSI period must be 6, 12 or 24, got 14".to_string()
            )
        );
    }

    #[test]
    fn test_candle_fetch_error_from_transport() {
        let error: CandleFetchError = MarketDataError::Timeout.into();
        assert_eq!(error.to_string(), "Candle fetch failed: Request timed out");
    }
}
