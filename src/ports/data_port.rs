//! Data access port trait.

use crate::domain::error::InsightError;
use crate::domain::ohlcv::Bar;
use crate::domain::series::Instrument;
use chrono::NaiveDate;

pub trait DataPort {
    /// Every instrument the provider knows about, ordered by symbol.
    fn list_instruments(&self) -> Result<Vec<Instrument>, InsightError>;

    /// Daily bars for `symbol` in the order the provider stores them.
    fn fetch_series(&self, symbol: &str) -> Result<Vec<Bar>, InsightError>;

    /// First date, last date and bar count, or `None` for an unknown symbol.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, InsightError>;
}
