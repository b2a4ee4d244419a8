//! BigSpike: an abrupt price and volume breakout from a quiet name.
//!
//! With `W = ob_window`, all six rules must hold at index `i`:
//! 1. `close[i] > max(high)` over `[i - W, i)`
//! 2. mean volume over `[i - W, i)` is below `rule_3_volume`
//! 3. `close[i] > open[i]`
//! 4. `close[i] > close[i - 1]`
//! 5. `volume[i] > rule_8_volume_multiple * MA(volume, i - 1, rule_8_horizon)`
//! 6. `MA(volume, i, W) < EMA(volume, i, W) < 1.5 * MA(volume, i, W)`

use crate::domain::indicator::{
    exponential_moving_average, highest, mean, moving_average,
};
use crate::domain::series::{PriceField, TimeSeries};
use crate::domain::strategy::{BaseFilterConfig, BigSpikeParams, SignalStrategy, StrategyKind};

/// Upper bound on EMA / MA of volume: accumulation, not a blow-off.
pub const ACCUMULATION_CEILING: f64 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct BigSpike {
    base: BaseFilterConfig,
    params: BigSpikeParams,
}

/// Per-rule outcome at one index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BigSpikeRules {
    pub breakout: bool,
    pub quiet_volume: bool,
    pub bullish_bar: bool,
    pub up_day: bool,
    pub volume_surge: bool,
    pub gradual_accumulation: bool,
}

impl BigSpikeRules {
    pub fn all(&self) -> bool {
        self.breakout
            && self.quiet_volume
            && self.bullish_bar
            && self.up_day
            && self.volume_surge
            && self.gradual_accumulation
    }
}

impl BigSpike {
    pub fn new(base: BaseFilterConfig, params: BigSpikeParams) -> Self {
        Self { base, params }
    }

    /// Evaluates every rule independently. Rules whose window is not
    /// available at `i` are false.
    pub fn evaluate_rules(&self, series: &TimeSeries, i: usize) -> BigSpikeRules {
        let w = self.params.ob_window;
        let (bar, prev, start) = match (series.bar(i), i.checked_sub(1), i.checked_sub(w)) {
            (Some(bar), Some(p), Some(start)) => (bar, &series.bars()[p], start),
            _ => return BigSpikeRules::default(),
        };

        let highs = series.field(PriceField::High);
        let volumes = series.field(PriceField::Volume);
        let volume = bar.volume as f64;

        let breakout = matches!(highest(highs, start, i), Ok(h) if bar.close > h);
        let quiet_volume =
            matches!(mean(volumes, start, i), Ok(v) if v < self.params.rule_3_volume);

        let volume_surge = matches!(
            moving_average(volumes, i - 1, self.params.rule_8_horizon),
            Ok(baseline) if volume > self.params.rule_8_volume_multiple * baseline
        );

        let gradual_accumulation = match (
            moving_average(volumes, i, w),
            exponential_moving_average(volumes, i, w),
        ) {
            (Ok(sma), Ok(ema)) => sma < ema && ema < ACCUMULATION_CEILING * sma,
            _ => false,
        };

        BigSpikeRules {
            breakout,
            quiet_volume,
            bullish_bar: bar.close > bar.open,
            up_day: bar.close > prev.close,
            volume_surge,
            gradual_accumulation,
        }
    }
}

impl SignalStrategy for BigSpike {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BigSpike
    }

    fn base_filter(&self) -> &BaseFilterConfig {
        &self.base
    }

    fn context_length(&self) -> usize {
        self.params.ob_window
    }

    fn future_length(&self) -> usize {
        0
    }

    fn apply_strategy(&self, series: &TimeSeries, i: usize) -> bool {
        self.evaluate_rules(series, i).all()
    }
}
