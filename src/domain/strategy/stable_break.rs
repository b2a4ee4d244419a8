//! StableBreak: a breakout from a range that held steady.
//!
//! The closeness window is `[i - c, i)` and the previous window is the `p`
//! bars before it. All four rules must hold; there is no partial credit.

use crate::domain::indicator::{highest, lowest, mean};
use crate::domain::series::{PriceField, TimeSeries};
use crate::domain::strategy::{
    BaseFilterConfig, SignalStrategy, StableBreakParams, StrategyKind,
};

/// Previous-window low must stay above this fraction of the recent high.
pub const RANGE_FLOOR: f64 = 0.95;
pub const VOLUME_CONFIRMATION: f64 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct StableBreak {
    base: BaseFilterConfig,
    params: StableBreakParams,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StableBreakRules {
    pub range_bound: bool,
    pub breakout: bool,
    pub volume_confirmed: bool,
    pub bullish_bar: bool,
}

impl StableBreakRules {
    pub fn all(&self) -> bool {
        self.range_bound && self.breakout && self.volume_confirmed && self.bullish_bar
    }
}

impl StableBreak {
    pub fn new(base: BaseFilterConfig, params: StableBreakParams) -> Self {
        Self { base, params }
    }

    pub fn evaluate_rules(&self, series: &TimeSeries, i: usize) -> StableBreakRules {
        let c = self.params.closeness_window;
        let p = self.params.previous_window;
        let prev_span = c.saturating_add(p);
        let (bar, close_start, prev_start) =
            match (series.bar(i), i.checked_sub(c), i.checked_sub(prev_span)) {
                (Some(bar), Some(cs), Some(ps)) => (bar, cs, ps),
                _ => return StableBreakRules::default(),
            };

        let close_high = highest(series.field(PriceField::High), close_start, i);
        let close_avg_vol = mean(series.field(PriceField::Volume), close_start, i);
        let prev_low = lowest(series.field(PriceField::Low), prev_start, close_start);

        let range_bound = match (&prev_low, &close_high) {
            (Ok(low), Ok(high)) => *low > RANGE_FLOOR * high,
            _ => false,
        };

        StableBreakRules {
            range_bound,
            breakout: matches!(close_high, Ok(high) if bar.close > high),
            volume_confirmed: matches!(
                close_avg_vol,
                Ok(avg) if bar.volume as f64 > VOLUME_CONFIRMATION * avg
            ),
            bullish_bar: bar.close > bar.open,
        }
    }
}

impl SignalStrategy for StableBreak {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StableBreak
    }

    fn base_filter(&self) -> &BaseFilterConfig {
        &self.base
    }

    fn context_length(&self) -> usize {
        self.params
            .closeness_window
            .saturating_add(self.params.previous_window)
    }

    fn future_length(&self) -> usize {
        0
    }

    fn apply_strategy(&self, series: &TimeSeries, i: usize) -> bool {
        self.evaluate_rules(series, i).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Bar;
    use chrono::NaiveDate;

    const BREAK: usize = 40;

    /// 40 bars trading 49..51 on 1000 volume, then a breakout bar at 40.
    fn range_bars() -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2021, 5, 3).unwrap();
        (0..45)
            .map(|i| {
                let (open, high, low, close, volume) = if i == BREAK {
                    (50.5, 53.5, 50.0, 53.0, 2_000)
                } else {
                    (50.0, 51.0, 49.0, 50.0, 1_000)
                };
                Bar {
                    date: start + chrono::Duration::days(i as i64),
                    open,
                    high,
                    low,
                    close,
                    volume,
                }
            })
            .collect()
    }

    fn strategy() -> StableBreak {
        StableBreak::new(
            BaseFilterConfig::new(20, 1.0, 100.0),
            StableBreakParams::default(),
        )
    }

    fn series_with(edit: impl FnOnce(&mut Vec<Bar>)) -> TimeSeries {
        let mut bars = range_bars();
        edit(&mut bars);
        TimeSeries::new("RANGE", bars).unwrap()
    }

    #[test]
    fn breakout_from_stable_range() {
        let series = series_with(|_| {});
        let rules = strategy().evaluate_rules(&series, BREAK);
        assert!(rules.all());
        assert!(strategy().forward(&series, BREAK));
    }

    #[test]
    fn only_breakout_bar_fires() {
        let series = series_with(|_| {});
        let s = strategy();
        let hits: Vec<usize> = (0..series.len()).filter(|&i| s.forward(&series, i)).collect();
        assert_eq!(hits, vec![BREAK]);
    }

    #[test]
    fn falling_previous_window_fails() {
        // previous window low well under 95% of the recent high
        let series = series_with(|bars| bars[5].low = 40.0);
        let rules = strategy().evaluate_rules(&series, BREAK);
        assert!(!rules.range_bound);
        assert!(rules.breakout && rules.volume_confirmed && rules.bullish_bar);
        assert!(!strategy().apply_strategy(&series, BREAK));
    }

    #[test]
    fn close_inside_range_fails() {
        let series = series_with(|bars| bars[BREAK].close = 50.9);
        let rules = strategy().evaluate_rules(&series, BREAK);
        assert!(!rules.breakout);
        assert!(rules.range_bound && rules.volume_confirmed && rules.bullish_bar);
        assert!(!rules.all());
    }

    #[test]
    fn thin_volume_fails() {
        let series = series_with(|bars| bars[BREAK].volume = 1_500);
        let rules = strategy().evaluate_rules(&series, BREAK);
        assert!(!rules.volume_confirmed);
        assert!(!rules.all());
    }

    #[test]
    fn bearish_bar_fails() {
        let series = series_with(|bars| bars[BREAK].open = 53.2);
        let rules = strategy().evaluate_rules(&series, BREAK);
        assert!(!rules.bullish_bar);
        assert!(rules.range_bound && rules.breakout && rules.volume_confirmed);
        assert!(!rules.all());
    }

    #[test]
    fn needs_both_windows() {
        let series = series_with(|_| {});
        assert_eq!(
            strategy().evaluate_rules(&series, 39),
            StableBreakRules::default()
        );
    }

    #[test]
    fn oversized_windows_never_fire() {
        let s = StableBreak::new(
            BaseFilterConfig::new(10, 1.0, 100.0),
            StableBreakParams {
                closeness_window: 10,
                previous_window: usize::MAX,
            },
        );
        assert_eq!(s.context_length(), usize::MAX);
        let series = series_with(|_| {});
        assert_eq!(s.evaluate_rules(&series, BREAK), StableBreakRules::default());
        assert!(!s.forward(&series, BREAK));
    }

    #[test]
    fn custom_windows() {
        let s = StableBreak::new(
            BaseFilterConfig::new(10, 1.0, 100.0),
            StableBreakParams {
                closeness_window: 10,
                previous_window: 5,
            },
        );
        assert_eq!(s.context_length(), 15);
        let series = series_with(|_| {});
        assert!(s.forward(&series, BREAK));
    }
}
