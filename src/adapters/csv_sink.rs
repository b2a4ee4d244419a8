//! CSV signal output.

use crate::domain::error::InsightError;
use crate::domain::signal::Signal;
use crate::ports::signal_port::SignalSink;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const HEADER: [&str; 6] = [
    "symbol",
    "date",
    "trigger_index",
    "low_roi",
    "high_roi",
    "hold_roi",
];

/// One row per signal; the ROI columns are empty for unscored signals.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

fn output_err(e: csv::Error) -> InsightError {
    InsightError::Output {
        reason: e.to_string(),
    }
}

impl CsvSink<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, InsightError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| InsightError::Output {
            reason: format!("failed to create {}: {}", path.display(), e),
        })?;
        Self::new(file)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Result<Self, InsightError> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(HEADER).map_err(output_err)?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> Result<W, InsightError> {
        self.writer.into_inner().map_err(|e| InsightError::Output {
            reason: e.to_string(),
        })
    }
}

impl<W: Write> SignalSink for CsvSink<W> {
    fn emit(&mut self, signal: &Signal) -> Result<(), InsightError> {
        let (low, high, hold) = match &signal.profit {
            Some(p) => (
                format!("{:.6}", p.low_roi),
                format!("{:.6}", p.high_roi),
                format!("{:.6}", p.hold_roi),
            ),
            None => (String::new(), String::new(), String::new()),
        };
        let date = signal.trigger_date.format("%Y-%m-%d").to_string();
        let index = signal.trigger_index.to_string();
        self.writer
            .write_record([
                signal.symbol.as_str(),
                date.as_str(),
                index.as_str(),
                low.as_str(),
                high.as_str(),
                hold.as_str(),
            ])
            .map_err(output_err)
    }

    fn finish(&mut self) -> Result<(), InsightError> {
        self.writer.flush().map_err(|e| InsightError::Output {
            reason: e.to_string(),
        })
    }
}
