//! Rule-based signal strategies.
//!
//! A strategy fires at index `i` when the shared base filter passes and its
//! own predicate holds (`forward`). The base filter is evaluated first so
//! indicator work is skipped for illiquid or cheap names. Each strategy also
//! declares how many trailing bars it needs (`context_length`) and how many
//! bars after `i` it reads (`future_length`).
//!
//! The variant set is closed: [`Strategy`] dispatches to [`BigSpike`] or
//! [`StableBreak`].

pub mod bigspike;
pub mod config;
pub mod stable_break;

pub use bigspike::{BigSpike, BigSpikeRules};
pub use config::{
    BaseFilterConfig, BigSpikeParams, StableBreakParams, StrategyConfig, StrategyKind,
    StrategyParams,
};
pub use stable_break::{StableBreak, StableBreakRules};

use crate::domain::indicator::{highest, lowest, mean};
use crate::domain::series::{PriceField, TimeSeries};

pub trait SignalStrategy {
    fn kind(&self) -> StrategyKind;

    fn base_filter(&self) -> &BaseFilterConfig;

    /// Trailing bars required before index `i` can be evaluated.
    fn context_length(&self) -> usize;

    /// Bars after `i` the predicate reads.
    fn future_length(&self) -> usize;

    /// Strategy-specific quote filter, checked after the base filter.
    fn filter_quotes(&self, _series: &TimeSeries, _i: usize) -> bool {
        true
    }

    fn apply_strategy(&self, series: &TimeSeries, i: usize) -> bool;

    /// Base filter, then `filter_quotes`, then `apply_strategy`. Overriding
    /// `filter_quotes` cannot bypass the base filter.
    fn forward(&self, series: &TimeSeries, i: usize) -> bool {
        passes_base_filter(self.base_filter(), series, i)
            && self.filter_quotes(series, i)
            && self.apply_strategy(series, i)
    }
}

/// Base filter over the trailing window `[i - ob_window, i)`.
///
/// Rejects when the window reaches before the series, when its lowest low is
/// under `min_price`, when its mean volume is under `min_volume`, and, with
/// `require_volatility`, when `max(close) / min(close)` does not exceed
/// `volatility_ratio`.
pub fn passes_base_filter(config: &BaseFilterConfig, series: &TimeSeries, i: usize) -> bool {
    if i >= series.len() {
        return false;
    }
    let start = match i.checked_sub(config.ob_window) {
        Some(s) => s,
        None => return false,
    };

    match lowest(series.field(PriceField::Low), start, i) {
        Ok(low) if low >= config.min_price => {}
        _ => return false,
    }

    match mean(series.field(PriceField::Volume), start, i) {
        Ok(vol) if vol >= config.min_volume => {}
        _ => return false,
    }

    if config.require_volatility {
        let closes = series.field(PriceField::Close);
        let (max_close, min_close) = match (highest(closes, start, i), lowest(closes, start, i)) {
            (Ok(max), Ok(min)) => (max, min),
            _ => return false,
        };
        if min_close <= 0.0 || max_close / min_close <= config.volatility_ratio {
            return false;
        }
    }

    true
}

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    BigSpike(BigSpike),
    StableBreak(StableBreak),
}

impl Strategy {
    pub fn from_config(config: &StrategyConfig) -> Self {
        match &config.params {
            StrategyParams::BigSpike(params) => {
                Strategy::BigSpike(BigSpike::new(config.base_filter.clone(), params.clone()))
            }
            StrategyParams::StableBreak(params) => Strategy::StableBreak(StableBreak::new(
                config.base_filter.clone(),
                params.clone(),
            )),
        }
    }
}

impl SignalStrategy for Strategy {
    fn kind(&self) -> StrategyKind {
        match self {
            Strategy::BigSpike(s) => s.kind(),
            Strategy::StableBreak(s) => s.kind(),
        }
    }

    fn base_filter(&self) -> &BaseFilterConfig {
        match self {
            Strategy::BigSpike(s) => s.base_filter(),
            Strategy::StableBreak(s) => s.base_filter(),
        }
    }

    fn context_length(&self) -> usize {
        match self {
            Strategy::BigSpike(s) => s.context_length(),
            Strategy::StableBreak(s) => s.context_length(),
        }
    }

    fn future_length(&self) -> usize {
        match self {
            Strategy::BigSpike(s) => s.future_length(),
            Strategy::StableBreak(s) => s.future_length(),
        }
    }

    fn filter_quotes(&self, series: &TimeSeries, i: usize) -> bool {
        match self {
            Strategy::BigSpike(s) => s.filter_quotes(series, i),
            Strategy::StableBreak(s) => s.filter_quotes(series, i),
        }
    }

    fn apply_strategy(&self, series: &TimeSeries, i: usize) -> bool {
        match self {
            Strategy::BigSpike(s) => s.apply_strategy(series, i),
            Strategy::StableBreak(s) => s.apply_strategy(series, i),
        }
    }
}
