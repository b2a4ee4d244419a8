//! Point-in-time technical indicators.
//!
//! Every function evaluates a trailing window ending at index `i` and never
//! reads a value after `i`. A window that would start before index 0, or an
//! index past the end of the input, yields [`IndicatorError`] instead of an
//! approximation:
//! - `moving_average(values, i, w)` needs `w <= i + 1`
//! - `exponential_moving_average(values, i, w)` needs `w <= i` (seed at `i - w`)
//! - `true_range(bars, i)` needs `i >= 1`
//! - `average_true_range` and `money_flow_index` need `w <= i`
//! - `mass_index(bars, i, w, p)` needs `w + 2p <= i + 1`

pub mod mass_index;
pub mod money_flow;
pub mod moving_average;
pub mod range;

pub use mass_index::{
    mass_index, reverse_bulge, MASS_INDEX_EMA_PERIOD, MASS_INDEX_WINDOW, REVERSE_BULGE_THRESHOLD,
};
pub use money_flow::money_flow_index;
pub use moving_average::{ema_series, exponential_moving_average, moving_average};
pub use range::{average_true_range, normalized_price, true_range, volatility};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    /// The window reaches before the first bar or past the last one.
    #[error("insufficient history at index {index}: lookback {lookback}")]
    InsufficientHistory { index: usize, lookback: usize },

    /// The inputs exist but the indicator has no defined value.
    #[error("{indicator} unavailable: {reason}")]
    Unavailable {
        indicator: &'static str,
        reason: &'static str,
    },
}

pub type IndicatorResult = Result<f64, IndicatorError>;

/// Checks that `index` is addressable and that `lookback` bars precede it.
pub(crate) fn require_history(
    len: usize,
    index: usize,
    lookback: usize,
) -> Result<(), IndicatorError> {
    if index >= len || index < lookback {
        return Err(IndicatorError::InsufficientHistory { index, lookback });
    }
    Ok(())
}

pub(crate) fn require_window(indicator: &'static str, window: usize) -> Result<(), IndicatorError> {
    if window == 0 {
        return Err(IndicatorError::Unavailable {
            indicator,
            reason: "window must be positive",
        });
    }
    Ok(())
}

fn window_slice(values: &[f64], start: usize, end: usize) -> Result<&[f64], IndicatorError> {
    if end > values.len() {
        return Err(IndicatorError::InsufficientHistory {
            index: end.saturating_sub(1),
            lookback: end.saturating_sub(start),
        });
    }
    if start >= end {
        return Err(IndicatorError::Unavailable {
            indicator: "window",
            reason: "empty window",
        });
    }
    Ok(&values[start..end])
}

/// Maximum over the half-open range `[start, end)`.
pub fn highest(values: &[f64], start: usize, end: usize) -> IndicatorResult {
    let window = window_slice(values, start, end)?;
    Ok(window.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Minimum over the half-open range `[start, end)`.
pub fn lowest(values: &[f64], start: usize, end: usize) -> IndicatorResult {
    let window = window_slice(values, start, end)?;
    Ok(window.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Arithmetic mean over the half-open range `[start, end)`.
pub fn mean(values: &[f64], start: usize, end: usize) -> IndicatorResult {
    let window = window_slice(values, start, end)?;
    Ok(window.iter().sum::<f64>() / window.len() as f64)
}
