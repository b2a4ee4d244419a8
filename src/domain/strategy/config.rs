//! Typed strategy parameters, built once at startup and shared read-only.

use std::fmt;
use std::str::FromStr;

pub const DEFAULT_VOLATILITY_RATIO: f64 = 1.4;
pub const DEFAULT_CLOSENESS_WINDOW: usize = 20;
pub const DEFAULT_PREVIOUS_WINDOW: usize = 20;

/// Liquidity / price / volatility gate applied before any strategy rule.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseFilterConfig {
    pub ob_window: usize,
    pub min_price: f64,
    pub min_volume: f64,
    /// Also require `max(close) / min(close) > volatility_ratio` over the window.
    pub require_volatility: bool,
    pub volatility_ratio: f64,
}

impl BaseFilterConfig {
    pub fn new(ob_window: usize, min_price: f64, min_volume: f64) -> Self {
        Self {
            ob_window,
            min_price,
            min_volume,
            require_volatility: false,
            volatility_ratio: DEFAULT_VOLATILITY_RATIO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BigSpikeParams {
    pub ob_window: usize,
    /// Ceiling on the trailing mean volume.
    pub rule_3_volume: f64,
    /// Bars in the volume baseline preceding the spike.
    pub rule_8_horizon: usize,
    pub rule_8_volume_multiple: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StableBreakParams {
    pub closeness_window: usize,
    pub previous_window: usize,
}

impl Default for StableBreakParams {
    fn default() -> Self {
        Self {
            closeness_window: DEFAULT_CLOSENESS_WINDOW,
            previous_window: DEFAULT_PREVIOUS_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyParams {
    BigSpike(BigSpikeParams),
    StableBreak(StableBreakParams),
}

impl StrategyParams {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyParams::BigSpike(_) => StrategyKind::BigSpike,
            StrategyParams::StableBreak(_) => StrategyKind::StableBreak,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub base_filter: BaseFilterConfig,
    pub params: StrategyParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    BigSpike,
    StableBreak,
}

impl StrategyKind {
    /// INI section holding this strategy's parameters.
    pub fn section(self) -> &'static str {
        match self {
            StrategyKind::BigSpike => "strategy.bigspike",
            StrategyKind::StableBreak => "strategy.stable_break",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::BigSpike => write!(f, "bigspike"),
            StrategyKind::StableBreak => write!(f, "stable_break"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bigspike" | "big_spike" | "big-spike" => Ok(StrategyKind::BigSpike),
            "stable_break" | "stable-break" | "stablebreak" => Ok(StrategyKind::StableBreak),
            other => Err(format!("unknown strategy '{other}'")),
        }
    }
}
