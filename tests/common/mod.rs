#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use stockinsight::domain::error::InsightError;
pub use stockinsight::domain::ohlcv::Bar;
use stockinsight::domain::series::Instrument;
use stockinsight::domain::signal::Signal;
use stockinsight::domain::strategy::{
    BaseFilterConfig, BigSpikeParams, StrategyConfig, StrategyParams,
};
use stockinsight::ports::data_port::DataPort;
use stockinsight::ports::signal_port::SignalSink;

/// Index of the BigSpike trigger in [`spike_bars`].
pub const SPIKE_AT: usize = 60;

/// In-memory provider. Instruments are listed in insertion order.
pub struct MockDataPort {
    pub order: Vec<String>,
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
    pub list_error: Option<String>,
    pub fetched: Mutex<Vec<String>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            data: HashMap::new(),
            errors: HashMap::new(),
            list_error: None,
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        if !self.order.iter().any(|s| s == symbol) {
            self.order.push(symbol.to_string());
        }
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        if !self.order.iter().any(|s| s == symbol) {
            self.order.push(symbol.to_string());
        }
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_list_error(mut self, reason: &str) -> Self {
        self.list_error = Some(reason.to_string());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl DataPort for MockDataPort {
    fn list_instruments(&self) -> Result<Vec<Instrument>, InsightError> {
        if let Some(reason) = &self.list_error {
            return Err(InsightError::Database {
                reason: reason.clone(),
            });
        }
        Ok(self.order.iter().map(Instrument::new).collect())
    }

    fn fetch_series(&self, symbol: &str) -> Result<Vec<Bar>, InsightError> {
        self.fetched.lock().unwrap().push(symbol.to_string());
        if let Some(reason) = self.errors.get(symbol) {
            return Err(InsightError::Database {
                reason: reason.clone(),
            });
        }
        self.data
            .get(symbol)
            .cloned()
            .ok_or_else(|| InsightError::NoData {
                symbol: symbol.to_string(),
            })
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, InsightError> {
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

/// Collects emitted signals.
#[derive(Default)]
pub struct RecordingSink {
    pub signals: Vec<Signal>,
    pub finished: bool,
}

impl SignalSink for RecordingSink {
    fn emit(&mut self, signal: &Signal) -> Result<(), InsightError> {
        self.signals.push(signal.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), InsightError> {
        self.finished = true;
        Ok(())
    }
}

/// Rejects every write.
pub struct BrokenSink;

impl SignalSink for BrokenSink {
    fn emit(&mut self, _signal: &Signal) -> Result<(), InsightError> {
        Err(InsightError::Output {
            reason: "disk full".into(),
        })
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(day: usize, open: f64, high: f64, low: f64, close: f64, volume: i64) -> Bar {
    Bar {
        date: date(2021, 1, 1) + chrono::Duration::days(day as i64),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Quiet bars around 10.0 with volume creeping up from 1000.
pub fn quiet_bars(count: usize) -> Vec<Bar> {
    (0..count)
        .map(|i| make_bar(i, 10.0, 10.5, 9.5, 10.0, 1000 + 10 * i as i64))
        .collect()
}

/// 80 quiet bars with a single BigSpike breakout at [`SPIKE_AT`].
pub fn spike_bars() -> Vec<Bar> {
    let mut bars = quiet_bars(80);
    bars[SPIKE_AT] = make_bar(SPIKE_AT, 10.2, 11.6, 10.1, 11.5, 6000);
    bars
}

pub fn bigspike_config() -> StrategyConfig {
    StrategyConfig {
        base_filter: BaseFilterConfig::new(20, 1.0, 100.0),
        params: StrategyParams::BigSpike(BigSpikeParams {
            ob_window: 20,
            rule_3_volume: 300_000.0,
            rule_8_horizon: 5,
            rule_8_volume_multiple: 3.0,
        }),
    }
}

pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}
