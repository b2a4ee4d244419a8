//! Scan driver: walks each instrument's series and emits signals.
//!
//! Backtest mode scans `[len - past - future, len - future)` and scores every
//! signal over the following `future` bars. Live mode scans the last
//! `live_lookback` bars with the strategy's own `future_length` and emits
//! unscored signals.
//!
//! Instruments are independent. With `workers > 1` they are scanned on a
//! rayon pool and the results are emitted in provider order, so the output
//! matches a sequential run. Cancellation and the run timeout are checked
//! between instruments, never inside one.

use crate::domain::error::InsightError;
use crate::domain::indicator::{highest, lowest};
use crate::domain::series::{Instrument, PriceField, TimeSeries};
use crate::domain::signal::{ProfitSummary, Signal};
use crate::domain::strategy::{SignalStrategy, Strategy};
use crate::ports::data_port::DataPort;
use crate::ports::signal_port::SignalSink;
use rayon::prelude::*;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

pub const DEFAULT_PAST_WINDOW: usize = 100;
pub const DEFAULT_FUTURE_WINDOW: usize = 20;
pub const DEFAULT_LIVE_LOOKBACK: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Backtest,
    Live,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Backtest => write!(f, "backtest"),
            ScanMode::Live => write!(f, "live"),
        }
    }
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "backtest" | "back_test" | "back-test" => Ok(ScanMode::Backtest),
            "live" | "run" => Ok(ScanMode::Live),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub mode: ScanMode,
    pub past_window: usize,
    pub future_window: usize,
    pub live_lookback: usize,
    pub workers: usize,
    pub timeout: Option<Duration>,
    /// Restrict the scan to these symbols; empty scans everything listed.
    pub symbols: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::Backtest,
            past_window: DEFAULT_PAST_WINDOW,
            future_window: DEFAULT_FUTURE_WINDOW,
            live_lookback: DEFAULT_LIVE_LOOKBACK,
            workers: 1,
            timeout: None,
            symbols: Vec::new(),
        }
    }
}

impl ScanConfig {
    /// (past, future) budgets for the configured mode.
    pub fn windows<S: SignalStrategy + ?Sized>(&self, strategy: &S) -> (usize, usize) {
        match self.mode {
            ScanMode::Backtest => (self.past_window, self.future_window),
            ScanMode::Live => (self.live_lookback, strategy.future_length()),
        }
    }
}

/// Index range scanned for a series of `len` bars.
///
/// `start = max(len - past - future, 0)`, `end = max(len - future, 0)`. A
/// series shorter than `past + future` yields an empty range, as does a
/// budget too large to represent.
pub fn scan_range(len: usize, past: usize, future: usize) -> Range<usize> {
    let span = past.saturating_add(future);
    if len < span {
        return 0..0;
    }
    (len - span)..(len - future)
}

/// Scores a signal at `idx`: entry at the next bar's open, extremes over
/// `[idx, idx + future_window]`, exit at the open of `idx + future_window`.
pub fn profit_summary(
    series: &TimeSeries,
    idx: usize,
    future_window: usize,
) -> Option<ProfitSummary> {
    let exit_idx = idx.checked_add(future_window)?;
    let entry = series.bar(idx.checked_add(1)?)?.open;
    let exit = series.bar(exit_idx)?.open;
    if entry <= 0.0 {
        return None;
    }
    let end = exit_idx + 1;
    let low = lowest(series.field(PriceField::Low), idx, end).ok()?;
    let high = highest(series.field(PriceField::High), idx, end).ok()?;
    Some(ProfitSummary::from_prices(entry, low, high, exit))
}

/// Scans one series in ascending index order.
pub fn scan_series<S: SignalStrategy + ?Sized>(
    strategy: &S,
    series: &TimeSeries,
    config: &ScanConfig,
) -> Vec<Signal> {
    let (past, future) = config.windows(strategy);

    let mut signals = Vec::new();
    for idx in scan_range(series.len(), past, future) {
        if !strategy.forward(series, idx) {
            continue;
        }
        let profit = match config.mode {
            ScanMode::Backtest => profit_summary(series, idx, config.future_window),
            ScanMode::Live => None,
        };
        let date = series.bars()[idx].date;
        debug!(symbol = series.symbol(), %date, idx, "signal");
        signals.push(Signal {
            symbol: series.symbol().to_string(),
            trigger_index: idx,
            trigger_date: date,
            profit,
        });
    }
    signals
}

/// Shared flag for stopping a scan between instruments.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    FetchFailed(String),
    Unordered(String),
    InsufficientHistory { bars: usize, required: usize },
    Cancelled,
    TimedOut,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FetchFailed(reason) => write!(f, "fetch failed: {reason}"),
            SkipReason::Unordered(reason) => write!(f, "unordered series: {reason}"),
            SkipReason::InsufficientHistory { bars, required } => {
                write!(f, "only {bars} bars, {required} required")
            }
            SkipReason::Cancelled => write!(f, "cancelled"),
            SkipReason::TimedOut => write!(f, "run timed out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInstrument {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    pub instruments: usize,
    pub scanned: usize,
    pub signals: usize,
    pub scored: usize,
    pub profitable: usize,
    pub skipped: Vec<SkippedInstrument>,
}

impl ScanSummary {
    /// Share of scored signals with a positive hold return.
    pub fn win_rate(&self) -> Option<f64> {
        if self.scored == 0 {
            return None;
        }
        Some(self.profitable as f64 / self.scored as f64)
    }
}

type InstrumentOutcome = Result<Vec<Signal>, SkipReason>;

pub struct Scanner {
    strategy: Strategy,
    config: ScanConfig,
    cancel: CancelToken,
}

impl Scanner {
    pub fn new(strategy: Strategy, config: ScanConfig) -> Self {
        Self {
            strategy,
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Scans every instrument and hands signals to `sink`.
    ///
    /// A failure to list instruments or to write to the sink is returned;
    /// anything wrong with a single instrument is logged and recorded in the
    /// summary.
    pub fn run(
        &self,
        port: &(dyn DataPort + Sync),
        sink: &mut dyn SignalSink,
    ) -> Result<ScanSummary, InsightError> {
        let instruments = self.resolve_instruments(port)?;
        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        let mut summary = ScanSummary {
            instruments: instruments.len(),
            ..ScanSummary::default()
        };

        info!(
            strategy = %self.strategy.kind(),
            mode = %self.config.mode,
            instruments = instruments.len(),
            workers = self.config.workers,
            "scan started"
        );

        if self.config.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .build()
                .map_err(|e| InsightError::ConfigInvalid {
                    section: "backtest".into(),
                    key: "workers".into(),
                    reason: e.to_string(),
                })?;
            let outcomes: Vec<InstrumentOutcome> = pool.install(|| {
                instruments
                    .par_iter()
                    .map(|inst| self.scan_instrument(port, inst, deadline))
                    .collect()
            });
            for (inst, outcome) in instruments.iter().zip(outcomes) {
                record_outcome(&mut summary, inst, outcome, sink)?;
            }
        } else {
            for inst in &instruments {
                let outcome = self.scan_instrument(port, inst, deadline);
                record_outcome(&mut summary, inst, outcome, sink)?;
            }
        }

        sink.finish()?;

        info!(
            scanned = summary.scanned,
            signals = summary.signals,
            skipped = summary.skipped.len(),
            "scan finished"
        );
        Ok(summary)
    }

    fn resolve_instruments(
        &self,
        port: &(dyn DataPort + Sync),
    ) -> Result<Vec<Instrument>, InsightError> {
        if self.config.symbols.is_empty() {
            return port.list_instruments();
        }
        Ok(self
            .config
            .symbols
            .iter()
            .map(|s| Instrument::new(s.trim().to_uppercase()))
            .collect())
    }

    fn scan_instrument(
        &self,
        port: &(dyn DataPort + Sync),
        instrument: &Instrument,
        deadline: Option<Instant>,
    ) -> InstrumentOutcome {
        if self.cancel.is_cancelled() {
            return Err(SkipReason::Cancelled);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(SkipReason::TimedOut);
        }

        let symbol = &instrument.symbol;
        trace!(%symbol, "fetching series");
        let bars = port
            .fetch_series(symbol)
            .map_err(|e| SkipReason::FetchFailed(e.to_string()))?;
        let series =
            TimeSeries::new(symbol.clone(), bars).map_err(|e| SkipReason::Unordered(e.to_string()))?;

        let (past, future) = self.config.windows(&self.strategy);
        let required = past
            .saturating_add(future)
            .max(self.strategy.context_length().saturating_add(1));
        if series.len() < required {
            return Err(SkipReason::InsufficientHistory {
                bars: series.len(),
                required,
            });
        }

        Ok(scan_series(&self.strategy, &series, &self.config))
    }
}

fn record_outcome(
    summary: &mut ScanSummary,
    instrument: &Instrument,
    outcome: InstrumentOutcome,
    sink: &mut dyn SignalSink,
) -> Result<(), InsightError> {
    match outcome {
        Ok(signals) => {
            summary.scanned += 1;
            for signal in &signals {
                if let Some(profit) = &signal.profit {
                    summary.scored += 1;
                    if profit.hold_roi > 0.0 {
                        summary.profitable += 1;
                    }
                }
                sink.emit(signal)?;
            }
            summary.signals += signals.len();
        }
        Err(reason) => {
            warn!(symbol = %instrument.symbol, %reason, "skipping instrument");
            summary.skipped.push(SkippedInstrument {
                symbol: instrument.symbol.clone(),
                reason,
            });
        }
    }
    Ok(())
}
