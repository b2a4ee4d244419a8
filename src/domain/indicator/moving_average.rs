//! Simple and exponential moving averages.
//!
//! The EMA uses a single seed-then-recurse definition: seed with the value at
//! `i - w`, then `ema += k * (v - ema)` for every index through `i`, where
//! `k = 2 / (w + 1)`.

use crate::domain::indicator::{require_history, require_window, IndicatorError, IndicatorResult};

/// Mean of the `window` values at indices `i - window + 1 ..= i`.
pub fn moving_average(values: &[f64], i: usize, window: usize) -> IndicatorResult {
    require_window("moving average", window)?;
    require_history(values.len(), i, window - 1)?;
    let slice = &values[i + 1 - window..=i];
    Ok(slice.iter().sum::<f64>() / window as f64)
}

pub fn exponential_moving_average(values: &[f64], i: usize, window: usize) -> IndicatorResult {
    require_window("exponential moving average", window)?;
    require_history(values.len(), i, window)?;
    let k = smoothing_factor(window);
    let mut ema = values[i - window];
    for &v in &values[i + 1 - window..=i] {
        ema += k * (v - ema);
    }
    Ok(ema)
}

/// The trailing `lead` EMA values ending at `i`, as one continuous recurrence.
///
/// The seed sits at `i + 1 - lead - window`, so the first returned value has
/// already absorbed `window` updates. The last element equals
/// `exponential_moving_average(values, i, window)` only when `lead == 1`.
pub fn ema_series(
    values: &[f64],
    i: usize,
    lead: usize,
    window: usize,
) -> Result<Vec<f64>, IndicatorError> {
    require_window("ema series", window)?;
    require_window("ema series", lead)?;
    require_history(values.len(), i, lead + window - 1)?;

    let k = smoothing_factor(window);
    let seed = i + 1 - lead - window;
    let first_kept = i + 1 - lead;
    let mut ema = values[seed];
    let mut out = Vec::with_capacity(lead);
    for (idx, &v) in values.iter().enumerate().take(i + 1).skip(seed + 1) {
        ema += k * (v - ema);
        if idx >= first_kept {
            out.push(ema);
        }
    }
    Ok(out)
}

fn smoothing_factor(window: usize) -> f64 {
    2.0 / (window as f64 + 1.0)
}
