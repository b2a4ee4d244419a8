//! Signal output port trait.

use crate::domain::error::InsightError;
use crate::domain::signal::Signal;

pub trait SignalSink {
    fn emit(&mut self, signal: &Signal) -> Result<(), InsightError>;

    /// Flushes buffered output. Called once at the end of a scan.
    fn finish(&mut self) -> Result<(), InsightError> {
        Ok(())
    }
}
