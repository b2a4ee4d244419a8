//! Line-per-signal text output.

use crate::domain::error::InsightError;
use crate::domain::signal::Signal;
use crate::ports::signal_port::SignalSink;
use std::io::Write;

/// Writes `Ticker: <SYMBOL>, Date: <YYYY-MM-DD>[, Profit: ...]` lines.
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SignalSink for ConsoleSink<W> {
    fn emit(&mut self, signal: &Signal) -> Result<(), InsightError> {
        writeln!(self.out, "{}", signal).map_err(|e| InsightError::Output {
            reason: e.to_string(),
        })
    }

    fn finish(&mut self) -> Result<(), InsightError> {
        self.out.flush().map_err(|e| InsightError::Output {
            reason: e.to_string(),
        })
    }
}
