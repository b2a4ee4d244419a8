//! Per-instrument time series and instrument metadata.

use crate::domain::error::InsightError;
use crate::domain::ohlcv::Bar;

/// Instrument metadata as listed by the data provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub ipo_year: Option<i32>,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self {
            name: symbol.clone(),
            symbol,
            sector: None,
            industry: None,
            ipo_year: None,
        }
    }
}

/// A single numeric column of a bar sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl PriceField {
    pub fn extract(self, bar: &Bar) -> f64 {
        match self {
            PriceField::Open => bar.open,
            PriceField::High => bar.high,
            PriceField::Low => bar.low,
            PriceField::Close => bar.close,
            PriceField::Volume => bar.volume as f64,
        }
    }
}

/// Chronologically ordered bars for one instrument.
///
/// Dates are strictly ascending. Each price field is also held as a
/// contiguous `f64` column so window indicators can work on slices.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    symbol: String,
    bars: Vec<Bar>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
}

impl TimeSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, InsightError> {
        let symbol = symbol.into();
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(InsightError::SeriesOrder {
                    symbol,
                    reason: format!("{} follows {}", pair[1].date, pair[0].date),
                });
            }
        }

        let column = |field: PriceField| bars.iter().map(|b| field.extract(b)).collect();

        Ok(Self {
            open: column(PriceField::Open),
            high: column(PriceField::High),
            low: column(PriceField::Low),
            close: column(PriceField::Close),
            volume: column(PriceField::Volume),
            symbol,
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bar(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn field(&self, field: PriceField) -> &[f64] {
        match field {
            PriceField::Open => &self.open,
            PriceField::High => &self.high,
            PriceField::Low => &self.low,
            PriceField::Close => &self.close,
            PriceField::Volume => &self.volume,
        }
    }
}
