//! Signal records emitted by a scan.

use chrono::NaiveDate;
use std::fmt;

/// Forward returns relative to the entry price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitSummary {
    pub low_roi: f64,
    pub high_roi: f64,
    pub hold_roi: f64,
}

impl ProfitSummary {
    pub fn from_prices(entry: f64, low: f64, high: f64, exit: f64) -> Self {
        Self {
            low_roi: low / entry - 1.0,
            high_roi: high / entry - 1.0,
            hold_roi: exit / entry - 1.0,
        }
    }
}

impl fmt::Display for ProfitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "low_roi: {:.2}, high_roi: {:.2}, hold_roi: {:.2}",
            self.low_roi, self.high_roi, self.hold_roi
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub trigger_index: usize,
    pub trigger_date: NaiveDate,
    pub profit: Option<ProfitSummary>,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ticker: {}, Date: {}", self.symbol, self.trigger_date)?;
        if let Some(profit) = &self.profit {
            write!(f, ", Profit: {}", profit)?;
        }
        Ok(())
    }
}
