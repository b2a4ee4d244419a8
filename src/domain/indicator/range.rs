//! Range-based indicators: true range, ATR, typical price, volatility.

use crate::domain::indicator::{
    require_history, require_window, IndicatorError, IndicatorResult,
};
use crate::domain::ohlcv::Bar;

pub fn true_range(bars: &[Bar], i: usize) -> IndicatorResult {
    require_history(bars.len(), i, 1)?;
    Ok(bars[i].true_range(bars[i - 1].close))
}

/// Mean of `true_range` over indices `i - window + 1 ..= i`.
pub fn average_true_range(bars: &[Bar], i: usize, window: usize) -> IndicatorResult {
    require_window("average true range", window)?;
    require_history(bars.len(), i, window)?;
    let sum: f64 = (i + 1 - window..=i)
        .map(|k| bars[k].true_range(bars[k - 1].close))
        .sum();
    Ok(sum / window as f64)
}

/// Typical price of bar `i`: (high + low + close) / 3.
pub fn normalized_price(bars: &[Bar], i: usize) -> IndicatorResult {
    require_history(bars.len(), i, 0)?;
    Ok(bars[i].typical_price())
}

/// ATR over `window` divided by the mean close over the same bars.
pub fn volatility(bars: &[Bar], i: usize, window: usize) -> IndicatorResult {
    let atr = average_true_range(bars, i, window)?;
    let mean_close =
        bars[i + 1 - window..=i].iter().map(|b| b.close).sum::<f64>() / window as f64;
    if mean_close == 0.0 {
        return Err(IndicatorError::Unavailable {
            indicator: "volatility",
            reason: "mean close is zero",
        });
    }
    Ok(atr / mean_close)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2021, 3, day).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    fn sample_bars() -> Vec<Bar> {
        vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 115.0, 105.0, 110.0),
            make_bar(3, 130.0, 120.0, 125.0),
            make_bar(4, 120.0, 110.0, 115.0),
        ]
    }

    #[test]
    fn true_range_uses_previous_close() {
        let bars = sample_bars();
        // gap up: |130 - 110| = 20
        assert_abs_diff_eq!(true_range(&bars, 2).unwrap(), 20.0);
        // hl = 10, |120 - 125| = 5, |110 - 125| = 15
        assert_abs_diff_eq!(true_range(&bars, 3).unwrap(), 15.0);
    }

    #[test]
    fn true_range_requires_previous_bar() {
        let bars = sample_bars();
        assert_eq!(
            true_range(&bars, 0),
            Err(IndicatorError::InsufficientHistory {
                index: 0,
                lookback: 1
            })
        );
    }

    #[test]
    fn atr_is_mean_of_true_ranges() {
        let bars = sample_bars();
        // TR(1) = 10, TR(2) = 20, TR(3) = 15
        assert_abs_diff_eq!(average_true_range(&bars, 3, 3).unwrap(), 15.0);
        assert_abs_diff_eq!(average_true_range(&bars, 3, 2).unwrap(), 17.5);
    }

    #[test]
    fn atr_insufficient_history() {
        let bars = sample_bars();
        assert!(average_true_range(&bars, 2, 3).is_err());
    }

    #[test]
    fn normalized_price_is_typical() {
        let bars = sample_bars();
        assert_abs_diff_eq!(
            normalized_price(&bars, 0).unwrap(),
            (110.0 + 100.0 + 105.0) / 3.0
        );
        assert!(normalized_price(&bars, 4).is_err());
    }

    #[test]
    fn volatility_ratio() {
        let bars = sample_bars();
        let expected = 15.0 / ((110.0 + 125.0 + 115.0) / 3.0);
        assert_abs_diff_eq!(volatility(&bars, 3, 3).unwrap(), expected, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn true_range_at_least_high_low(
            prev_close in 1.0f64..500.0,
            low in 1.0f64..500.0,
            spread in 0.0f64..50.0,
        ) {
            let bars = vec![
                make_bar(1, prev_close, prev_close, prev_close),
                make_bar(2, low + spread, low, low),
            ];
            let tr = true_range(&bars, 1).unwrap();
            prop_assert!(tr >= bars[1].high - bars[1].low);
        }
    }
}
