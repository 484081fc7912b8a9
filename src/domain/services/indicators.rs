use crate::domain::errors::IndicatorError;

/// Wilder RSI periods the oscillator is defined for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RsiPeriod {
    Six,
    Twelve,
    TwentyFour,
}

impl RsiPeriod {
    pub fn value(&self) -> usize {
        match self {
            RsiPeriod::Six => 6,
            RsiPeriod::Twelve => 12,
            RsiPeriod::TwentyFour => 24,
        }
    }
}

impl TryFrom<usize> for RsiPeriod {
    type Error = IndicatorError;

    fn try_from(period: usize) -> Result<Self, Self::Error> {
        match period {
            6 => Ok(RsiPeriod::Six),
            12 => Ok(RsiPeriod::Twelve),
            24 => Ok(RsiPeriod::TwentyFour),
            other => Err(IndicatorError::UnsupportedRsiPeriod(other)),
        }
    }
}

/// Last value of the exponential moving average over `values`.
///
/// Seeded with the simple mean of the first `period` values, then smoothed
/// with `k = 2 / (period + 1)`. Returns `None` when `period` is zero or the
/// series is shorter than `period`.
pub fn ema_last(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;

    for &value in &values[period..] {
        ema = (value - ema) * multiplier + ema;
    }

    Some(ema)
}

/// Last value of Wilder's RSI over `closes`.
///
/// Only periods 6, 12 and 24 are accepted; anything else is an error rather
/// than an undefined value. Returns `Ok(None)` when fewer than `period + 1`
/// closes are available. A series without any loss yields exactly 100.
pub fn rsi_wilder_last(closes: &[f64], period: usize) -> Result<Option<f64>, IndicatorError> {
    let period = RsiPeriod::try_from(period)?.value();
    if closes.len() < period + 1 {
        return Ok(None);
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for window in closes[..=period].windows(2) {
        let diff = window[1] - window[0];
        gains += diff.max(0.0);
        losses += (-diff).max(0.0);
    }

    let n = period as f64;
    let mut avg_gain = gains / n;
    let mut avg_loss = losses / n;

    for window in closes[period..].windows(2) {
        let diff = window[1] - window[0];
        avg_gain = (avg_gain * (n - 1.0) + diff.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-diff).max(0.0)) / n;
    }

    if avg_loss == 0.0 {
        return Ok(Some(100.0));
    }

    let rs = avg_gain / avg_loss;
    Ok(Some(100.0 - 100.0 / (1.0 + rs)))
}
