//! Mass Index and the reversal bulge built on it.
//!
//! single = EMA(high - low, p), double = EMA(single, p), and the index is the
//! sum of `single / double` over the trailing `w` bars. The double smoothing
//! needs `2p` bars of warm-up beyond the `w` summed values.

use crate::domain::indicator::{
    ema_series, require_history, require_window, IndicatorError, IndicatorResult,
};
use crate::domain::ohlcv::Bar;

pub const MASS_INDEX_WINDOW: usize = 25;
pub const MASS_INDEX_EMA_PERIOD: usize = 9;
pub const REVERSE_BULGE_THRESHOLD: f64 = 26.5;

pub fn mass_index(bars: &[Bar], i: usize, window: usize, ema_period: usize) -> IndicatorResult {
    require_window("mass index", window)?;
    require_window("mass index", ema_period)?;
    let needed = window + 2 * ema_period;
    require_history(bars.len(), i, needed - 1).map_err(|_| IndicatorError::Unavailable {
        indicator: "mass index",
        reason: "double EMA warm-up not met",
    })?;

    let start = i + 1 - needed;
    let ranges: Vec<f64> = bars[start..=i].iter().map(Bar::range).collect();
    let last = ranges.len() - 1;

    let single = ema_series(&ranges, last, window + ema_period, ema_period)?;
    let double = ema_series(&single, single.len() - 1, window, ema_period)?;

    let mut sum = 0.0;
    for (s, d) in single[ema_period..].iter().zip(&double) {
        if *d == 0.0 {
            return Err(IndicatorError::Unavailable {
                indicator: "mass index",
                reason: "zero double EMA",
            });
        }
        sum += s / d;
    }
    Ok(sum)
}

/// A bulge that has peaked: the previous mass index is at or above 26.5 and
/// the current one is lower. Any unavailable value means no bulge.
pub fn reverse_bulge(bars: &[Bar], i: usize) -> bool {
    if i == 0 {
        return false;
    }
    let prev = match mass_index(bars, i - 1, MASS_INDEX_WINDOW, MASS_INDEX_EMA_PERIOD) {
        Ok(v) => v,
        Err(_) => return false,
    };
    if prev < REVERSE_BULGE_THRESHOLD {
        return false;
    }
    match mass_index(bars, i, MASS_INDEX_WINDOW, MASS_INDEX_EMA_PERIOD) {
        Ok(cur) => cur < prev,
        Err(_) => false,
    }
}
