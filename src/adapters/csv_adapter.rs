//! CSV directory data adapter.
//!
//! Layout: one `<SYMBOL>.csv` per instrument with a
//! `date,open,high,low,close,volume` header, plus an optional
//! `instruments.csv` (`symbol,name,sector,industry,ipo_year`) carrying
//! metadata. Rows are returned in file order; ordering is checked upstream.
//! Symbols match file names without regard to ASCII case.

use crate::domain::error::InsightError;
use crate::domain::ohlcv::Bar;
use crate::domain::series::Instrument;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

pub const INSTRUMENTS_FILE: &str = "instruments.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// `<symbol>.csv`, falling back to a case-insensitive match in the
    /// directory.
    fn csv_path(&self, symbol: &str) -> Option<PathBuf> {
        let exact = self.base_path.join(format!("{}.csv", symbol));
        if exact.is_file() {
            return Some(exact);
        }
        let entries = fs::read_dir(&self.base_path).ok()?;
        entries.filter_map(Result::ok).map(|e| e.path()).find(|path| {
            path.is_file()
                && !path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.eq_ignore_ascii_case(INSTRUMENTS_FILE))
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
                && path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .is_some_and(|stem| stem.eq_ignore_ascii_case(symbol))
        })
    }

    fn read_metadata(&self) -> Result<HashMap<String, Instrument>, InsightError> {
        let path = self.base_path.join(INSTRUMENTS_FILE);
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| InsightError::Database {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut meta = HashMap::new();
        for result in rdr.records() {
            let record = result.map_err(|e| InsightError::Database {
                reason: format!("CSV parse error in {}: {}", INSTRUMENTS_FILE, e),
            })?;
            let symbol = match record.get(0).map(str::trim) {
                Some(s) if !s.is_empty() => s.to_uppercase(),
                _ => continue,
            };
            let text = |i: usize| {
                record
                    .get(i)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            let instrument = Instrument {
                name: text(1).unwrap_or_else(|| symbol.clone()),
                sector: text(2),
                industry: text(3),
                ipo_year: text(4).and_then(|y| y.parse().ok()),
                symbol: symbol.clone(),
            };
            meta.insert(symbol, instrument);
        }
        Ok(meta)
    }
}

fn parse_field<T: FromStr>(record: &csv::StringRecord, idx: usize, name: &str) -> Result<T, InsightError>
where
    T::Err: std::fmt::Display,
{
    record
        .get(idx)
        .ok_or_else(|| InsightError::Database {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse()
        .map_err(|e| InsightError::Database {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl DataPort for CsvAdapter {
    fn list_instruments(&self) -> Result<Vec<Instrument>, InsightError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| InsightError::Database {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;
        let mut meta = self.read_metadata()?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| InsightError::Database {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str.eq_ignore_ascii_case(INSTRUMENTS_FILE) {
                continue;
            }
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                let instrument = meta
                    .remove(&symbol.to_uppercase())
                    .map(|mut inst| {
                        inst.symbol = symbol.to_string();
                        inst
                    })
                    .unwrap_or_else(|| Instrument::new(symbol));
                instruments.push(instrument);
            }
        }

        instruments.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(instruments)
    }

    fn fetch_series(&self, symbol: &str) -> Result<Vec<Bar>, InsightError> {
        let path = self.csv_path(symbol).ok_or_else(|| InsightError::NoData {
            symbol: symbol.to_string(),
        })?;
        let content = fs::read_to_string(&path).map_err(|e| InsightError::Database {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| InsightError::Database {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| InsightError::Database {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                InsightError::Database {
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            bars.push(Bar {
                date,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_field(&record, 5, "volume")?,
            });
        }

        Ok(bars)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, InsightError> {
        let bars = match self.fetch_series(symbol) {
            Ok(bars) => bars,
            Err(InsightError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let first = bars.iter().map(|b| b.date).min();
        let last = bars.iter().map(|b| b.date).max();
        Ok(first.zip(last).map(|(first, last)| (first, last, bars.len())))
    }
}
