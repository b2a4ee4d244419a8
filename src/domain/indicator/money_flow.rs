//! Money Flow Index.
//!
//! Each bar in `(i - w, i]` is compared with the bar before it by typical
//! price. A rise adds `volume * typical_price` to positive flow, a fall adds it
//! to negative flow, a tie adds to neither. With no negative flow the index is
//! 100; otherwise `100 - 100 / (1 + positive / negative)`.

use crate::domain::indicator::{require_history, require_window, IndicatorResult};
use crate::domain::ohlcv::Bar;

pub fn money_flow_index(bars: &[Bar], i: usize, window: usize) -> IndicatorResult {
    require_window("money flow index", window)?;
    require_history(bars.len(), i, window)?;

    let mut positive = 0.0;
    let mut negative = 0.0;
    let mut prev_tp = bars[i - window].typical_price();

    for bar in &bars[i + 1 - window..=i] {
        let tp = bar.typical_price();
        let flow = bar.volume as f64 * tp;
        if tp > prev_tp {
            positive += flow;
        } else if tp < prev_tp {
            negative += flow;
        }
        prev_tp = tp;
    }

    if negative == 0.0 {
        return Ok(100.0);
    }
    Ok(100.0 - 100.0 / (1.0 + positive / negative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn make_bars(prices: &[(f64, i64)]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &(close, volume))| Bar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume,
            })
            .collect()
    }

    #[test]
    fn all_rising_is_100() {
        let bars = make_bars(&[(10.0, 100), (11.0, 100), (12.0, 100), (13.0, 100)]);
        assert_abs_diff_eq!(money_flow_index(&bars, 3, 3).unwrap(), 100.0);
    }

    #[test]
    fn flat_window_is_100() {
        let bars = make_bars(&[(10.0, 100), (10.0, 100), (10.0, 100)]);
        assert_abs_diff_eq!(money_flow_index(&bars, 2, 2).unwrap(), 100.0);
    }

    #[test]
    fn all_falling_is_zero() {
        let bars = make_bars(&[(13.0, 100), (12.0, 100), (11.0, 100)]);
        assert_abs_diff_eq!(money_flow_index(&bars, 2, 2).unwrap(), 0.0);
    }

    #[test]
    fn mixed_flow() {
        // +: 11*200 = 2200, -: 10*100 = 1000, tie contributes nothing
        let bars = make_bars(&[(10.0, 50), (11.0, 200), (10.0, 100), (10.0, 999)]);
        let ratio: f64 = 2200.0 / 1000.0;
        let expected = 100.0 - 100.0 / (1.0 + ratio);
        assert_abs_diff_eq!(
            money_flow_index(&bars, 3, 3).unwrap(),
            expected,
            epsilon = 1e-9
        );
    }

    #[test]
    fn window_reaching_before_start() {
        let bars = make_bars(&[(10.0, 100), (11.0, 100)]);
        assert!(money_flow_index(&bars, 1, 2).is_err());
    }

    proptest! {
        #[test]
        fn bounded_zero_to_hundred(
            prices in prop::collection::vec((1.0f64..200.0, 0i64..1_000_000), 2..50),
            w in 1usize..20,
        ) {
            let bars = make_bars(&prices);
            let i = bars.len() - 1;
            prop_assume!(w <= i);
            let mfi = money_flow_index(&bars, i, w).unwrap();
            prop_assert!((0.0..=100.0).contains(&mfi));
        }

        #[test]
        fn non_decreasing_window_is_100(
            start in 1.0f64..100.0,
            steps in prop::collection::vec(0.0f64..5.0, 1..30),
            volume in 0i64..100_000,
        ) {
            let mut prices = vec![(start, volume)];
            let mut level = start;
            for step in &steps {
                level += step;
                prices.push((level, volume));
            }
            let bars = make_bars(&prices);
            let i = bars.len() - 1;
            prop_assert_eq!(money_flow_index(&bars, i, steps.len()).unwrap(), 100.0);
        }
    }
}
