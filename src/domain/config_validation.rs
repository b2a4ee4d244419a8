//! Configuration validation.
//!
//! Validates every section a scan reads before any data provider is opened.
//! The typed readers here are shared with the CLI builders so a value that
//! validates is parsed the same way when it is used.

use crate::domain::error::InsightError;
use crate::domain::scan::{ScanMode, DEFAULT_FUTURE_WINDOW, DEFAULT_LIVE_LOOKBACK, DEFAULT_PAST_WINDOW};
use crate::domain::strategy::config::{DEFAULT_CLOSENESS_WINDOW, DEFAULT_PREVIOUS_WINDOW};
use crate::domain::strategy::StrategyKind;
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

pub const DEFAULT_POOL_SIZE: usize = 4;

/// Overrides replace `[strategy] name` and `[strategy] mode` so the checks
/// match the scan that will actually run.
pub fn validate_scan_config(
    config: &dyn ConfigPort,
    strategy_override: Option<StrategyKind>,
    mode_override: Option<ScanMode>,
) -> Result<(), InsightError> {
    validate_base_filter(config)?;
    let kind = match strategy_override {
        Some(kind) => kind,
        None => strategy_kind(config)?,
    };
    let mode = match mode_override {
        Some(mode) => mode,
        None => scan_mode(config)?,
    };
    validate_strategy_params(config, kind)?;
    validate_backtest(config, mode)?;
    validate_data(config)?;
    Ok(())
}

pub fn strategy_kind(config: &dyn ConfigPort) -> Result<StrategyKind, InsightError> {
    let name = require_string(config, "strategy", "name")?;
    name.parse().map_err(|reason| invalid("strategy", "name", reason))
}

/// `[strategy] mode`, defaulting to backtest.
pub fn scan_mode(config: &dyn ConfigPort) -> Result<ScanMode, InsightError> {
    match non_empty(config, "strategy", "mode") {
        Some(mode) => mode.parse().map_err(|reason| invalid("strategy", "mode", reason)),
        None => Ok(ScanMode::Backtest),
    }
}

fn validate_base_filter(config: &dyn ConfigPort) -> Result<(), InsightError> {
    let ob_window = require_usize(config, "base_filter", "ob_window")?;
    at_least_one("base_filter", "ob_window", ob_window)?;
    non_negative("base_filter", "min_price", require_f64(config, "base_filter", "min_price")?)?;
    non_negative("base_filter", "min_volume", require_f64(config, "base_filter", "min_volume")?)?;
    bool_or(config, "base_filter", "require_volatility", false)?;
    let ratio = f64_or(config, "base_filter", "volatility_ratio", 1.4)?;
    if ratio <= 0.0 {
        return Err(invalid("base_filter", "volatility_ratio", "must be positive"));
    }
    Ok(())
}

pub fn validate_strategy_params(
    config: &dyn ConfigPort,
    kind: StrategyKind,
) -> Result<(), InsightError> {
    let section = kind.section();
    match kind {
        StrategyKind::BigSpike => {
            at_least_one(section, "ob_window", require_usize(config, section, "ob_window")?)?;
            positive(section, "rule_3_volume", require_f64(config, section, "rule_3_volume")?)?;
            at_least_one(
                section,
                "rule_8_horizon",
                require_usize(config, section, "rule_8_horizon")?,
            )?;
            positive(
                section,
                "rule_8_volume_multiple",
                require_f64(config, section, "rule_8_volume_multiple")?,
            )?;
        }
        StrategyKind::StableBreak => {
            at_least_one(
                section,
                "closeness_window",
                usize_or(config, section, "closeness_window", DEFAULT_CLOSENESS_WINDOW)?,
            )?;
            at_least_one(
                section,
                "previous_window",
                usize_or(config, section, "previous_window", DEFAULT_PREVIOUS_WINDOW)?,
            )?;
        }
    }
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort, mode: ScanMode) -> Result<(), InsightError> {
    at_least_one(
        "backtest",
        "past_window",
        usize_or(config, "backtest", "past_window", DEFAULT_PAST_WINDOW)?,
    )?;
    let future = usize_or(config, "backtest", "future_window", DEFAULT_FUTURE_WINDOW)?;
    if mode == ScanMode::Backtest {
        at_least_one("backtest", "future_window", future)?;
    }
    at_least_one(
        "backtest",
        "live_lookback",
        usize_or(config, "backtest", "live_lookback", DEFAULT_LIVE_LOOKBACK)?,
    )?;
    at_least_one("backtest", "workers", usize_or(config, "backtest", "workers", 1)?)?;
    usize_or(config, "backtest", "timeout_secs", 0)?;
    Ok(())
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), InsightError> {
    let provider = require_string(config, "data", "provider")?;
    match provider.to_lowercase().as_str() {
        "csv" => {
            require_string(config, "data", "path")?;
        }
        "sqlite" => {
            require_string(config, "data", "path")?;
            at_least_one(
                "data",
                "pool_size",
                usize_or(config, "data", "pool_size", DEFAULT_POOL_SIZE)?,
            )?;
        }
        "postgres" => {
            require_string(config, "data", "host")?;
            let port = require_usize(config, "data", "port")?;
            if port == 0 || port > u16::MAX as usize {
                return Err(invalid("data", "port", "must be between 1 and 65535"));
            }
            require_string(config, "data", "database")?;
            require_string(config, "data", "user")?;
            require_string(config, "data", "password")?;
        }
        other => {
            return Err(invalid(
                "data",
                "provider",
                format!("unknown provider '{other}' (expected csv, sqlite or postgres)"),
            ));
        }
    }
    Ok(())
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> InsightError {
    InsightError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    raw: &str,
    expected: &str,
) -> Result<T, InsightError> {
    raw.parse()
        .map_err(|_| invalid(section, key, format!("expected {expected}, got '{raw}'")))
}

pub fn require_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, InsightError> {
    non_empty(config, section, key).ok_or_else(|| InsightError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })
}

pub fn require_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<usize, InsightError> {
    let raw = require_string(config, section, key)?;
    parse_value(section, key, &raw, "a non-negative integer")
}

pub fn usize_or(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, InsightError> {
    match non_empty(config, section, key) {
        Some(raw) => parse_value(section, key, &raw, "a non-negative integer"),
        None => Ok(default),
    }
}

pub fn require_f64(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, InsightError> {
    let raw = require_string(config, section, key)?;
    let value: f64 = parse_value(section, key, &raw, "a number")?;
    if !value.is_finite() {
        return Err(invalid(section, key, "must be finite"));
    }
    Ok(value)
}

pub fn f64_or(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, InsightError> {
    match non_empty(config, section, key) {
        Some(_) => require_f64(config, section, key),
        None => Ok(default),
    }
}

pub fn bool_or(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, InsightError> {
    match non_empty(config, section, key) {
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(invalid(section, key, format!("expected a boolean, got '{raw}'"))),
        },
        None => Ok(default),
    }
}

/// Comma-separated list; empty when the key is absent.
pub fn string_list(config: &dyn ConfigPort, section: &str, key: &str) -> Vec<String> {
    config
        .get_string(section, key)
        .map(|s| {
            s.split(',')
                .map(|part| part.trim().to_uppercase())
                .filter(|part| !part.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn at_least_one(section: &str, key: &str, value: usize) -> Result<(), InsightError> {
    if value == 0 {
        return Err(invalid(section, key, format!("{key} must be at least 1")));
    }
    Ok(())
}

fn non_negative(section: &str, key: &str, value: f64) -> Result<(), InsightError> {
    if value < 0.0 {
        return Err(invalid(section, key, format!("{key} must be non-negative")));
    }
    Ok(())
}

fn positive(section: &str, key: &str, value: f64) -> Result<(), InsightError> {
    if value <= 0.0 {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const BASE: &str = "[base_filter]\nob_window = 20\nmin_price = 1.0\nmin_volume = 10000\n";
    const BIGSPIKE: &str = "[strategy]\nname = bigspike\n[strategy.bigspike]\nob_window = 20\nrule_3_volume = 300000\nrule_8_horizon = 5\nrule_8_volume_multiple = 3\n";
    const DATA: &str = "[data]\nprovider = csv\npath = ./quotes\n";

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn with(extra: &str) -> FileConfigAdapter {
        make_config(&format!("{BASE}{BIGSPIKE}{DATA}{extra}"))
    }

    fn check(config: &FileConfigAdapter) -> Result<(), InsightError> {
        validate_scan_config(config, None, None)
    }

    #[test]
    fn valid_bigspike_config_passes() {
        let config = make_config(
            r#"
[base_filter]
ob_window = 20
min_price = 2.0
min_volume = 50000
require_volatility = yes
volatility_ratio = 1.4

[strategy]
name = bigspike
mode = backtest

[strategy.bigspike]
ob_window = 20
rule_3_volume = 300000
rule_8_horizon = 5
rule_8_volume_multiple = 3.0

[backtest]
past_window = 100
future_window = 20
workers = 4
timeout_secs = 60
symbols = AAPL, MSFT

[data]
provider = sqlite
path = stocks.db
pool_size = 2
"#,
        );
        assert!(check(&config).is_ok());
    }

    #[test]
    fn stable_break_windows_default() {
        let config = make_config(&format!("{BASE}[strategy]\nname = stable_break\n{DATA}"));
        assert!(check(&config).is_ok());
    }

    #[test]
    fn missing_base_filter_key_fails() {
        let config = make_config(&format!("[base_filter]\nob_window = 20\nmin_price = 1\n{BIGSPIKE}{DATA}"));
        let err = check(&config).unwrap_err();
        assert!(matches!(err, InsightError::ConfigMissing { key, .. } if key == "min_volume"));
    }

    #[test]
    fn zero_ob_window_fails() {
        let config = make_config(&format!(
            "[base_filter]\nob_window = 0\nmin_price = 1\nmin_volume = 1\n{BIGSPIKE}{DATA}"
        ));
        let err = check(&config).unwrap_err();
        assert!(matches!(err, InsightError::ConfigInvalid { key, .. } if key == "ob_window"));
    }

    #[test]
    fn negative_min_price_fails() {
        let config = make_config(&format!(
            "[base_filter]\nob_window = 5\nmin_price = -1\nmin_volume = 1\n{BIGSPIKE}{DATA}"
        ));
        let err = check(&config).unwrap_err();
        assert!(matches!(err, InsightError::ConfigInvalid { key, .. } if key == "min_price"));
    }

    #[test]
    fn bad_bool_fails() {
        let config = make_config(&format!(
            "[base_filter]\nob_window = 5\nmin_price = 1\nmin_volume = 1\nrequire_volatility = maybe\n{BIGSPIKE}{DATA}"
        ));
        let err = check(&config).unwrap_err();
        assert!(
            matches!(err, InsightError::ConfigInvalid { key, .. } if key == "require_volatility")
        );
    }

    #[test]
    fn unknown_strategy_fails() {
        let config = make_config(&format!("{BASE}[strategy]\nname = momentum\n{DATA}"));
        let err = check(&config).unwrap_err();
        assert!(matches!(err, InsightError::ConfigInvalid { key, .. } if key == "name"));
    }

    #[test]
    fn missing_strategy_name_uses_override() {
        let config = make_config(&format!("{BASE}{DATA}"));
        assert!(matches!(
            check(&config).unwrap_err(),
            InsightError::ConfigMissing { key, .. } if key == "name"
        ));
        assert!(validate_scan_config(&config, Some(StrategyKind::StableBreak), None).is_ok());
    }

    #[test]
    fn bigspike_requires_rule_keys() {
        let config = make_config(&format!(
            "{BASE}[strategy]\nname = bigspike\n[strategy.bigspike]\nob_window = 20\nrule_3_volume = 1000\nrule_8_horizon = 5\n{DATA}"
        ));
        let err = check(&config).unwrap_err();
        assert!(matches!(
            err,
            InsightError::ConfigMissing { section, key } if section == "strategy.bigspike" && key == "rule_8_volume_multiple"
        ));
    }

    #[test]
    fn non_numeric_value_fails() {
        let err = check(&with("[backtest]\npast_window = lots\n")).unwrap_err();
        assert!(matches!(err, InsightError::ConfigInvalid { key, .. } if key == "past_window"));
    }

    #[test]
    fn backtest_needs_future_window() {
        let err = check(&with("[backtest]\nfuture_window = 0\n")).unwrap_err();
        assert!(matches!(err, InsightError::ConfigInvalid { key, .. } if key == "future_window"));
    }

    #[test]
    fn live_mode_allows_zero_future_window() {
        let config = make_config(&format!(
            "{BASE}[strategy]\nname = stable_break\nmode = live\n[backtest]\nfuture_window = 0\n{DATA}"
        ));
        assert!(check(&config).is_ok());
    }

    #[test]
    fn mode_override_decides_future_window_check() {
        let config = with("[backtest]\nfuture_window = 0\n");
        assert!(validate_scan_config(&config, None, Some(ScanMode::Live)).is_ok());

        let config = make_config(&format!(
            "{BASE}[strategy]\nname = stable_break\nmode = live\n[backtest]\nfuture_window = 0\n{DATA}"
        ));
        let err = validate_scan_config(&config, None, Some(ScanMode::Backtest)).unwrap_err();
        assert!(matches!(err, InsightError::ConfigInvalid { key, .. } if key == "future_window"));
    }

    #[test]
    fn oversized_windows_are_accepted() {
        let config = with("[backtest]\npast_window = 18446744073709551615\n");
        assert!(check(&config).is_ok());
        assert_eq!(
            usize_or(&config, "backtest", "past_window", 0).unwrap(),
            usize::MAX
        );
    }

    #[test]
    fn unknown_mode_fails() {
        let config = make_config(&format!("{BASE}[strategy]\nname = bigspike\nmode = paper\n{DATA}"));
        let err = check(&config).unwrap_err();
        assert!(matches!(err, InsightError::ConfigInvalid { key, .. } if key == "mode"));
    }

    #[test]
    fn zero_workers_fails() {
        let err = check(&with("[backtest]\nworkers = 0\n")).unwrap_err();
        assert!(matches!(err, InsightError::ConfigInvalid { key, .. } if key == "workers"));
    }

    #[test]
    fn missing_provider_fails() {
        let config = make_config(&format!("{BASE}{BIGSPIKE}"));
        let err = check(&config).unwrap_err();
        assert!(matches!(err, InsightError::ConfigMissing { key, .. } if key == "provider"));
    }

    #[test]
    fn unknown_provider_fails() {
        let config = make_config(&format!("{BASE}{BIGSPIKE}[data]\nprovider = mysql\n"));
        let err = check(&config).unwrap_err();
        assert!(matches!(err, InsightError::ConfigInvalid { key, .. } if key == "provider"));
    }

    #[test]
    fn postgres_requires_credentials() {
        let config = make_config(&format!(
            "{BASE}{BIGSPIKE}[data]\nprovider = postgres\nhost = db\nport = 5432\ndatabase = stocks\nuser = reader\n"
        ));
        let err = check(&config).unwrap_err();
        assert!(matches!(err, InsightError::ConfigMissing { key, .. } if key == "password"));
    }

    #[test]
    fn postgres_port_range() {
        let config = make_config(&format!(
            "{BASE}{BIGSPIKE}[data]\nprovider = postgres\nhost = db\nport = 70000\ndatabase = s\nuser = u\npassword = p\n"
        ));
        let err = check(&config).unwrap_err();
        assert!(matches!(err, InsightError::ConfigInvalid { key, .. } if key == "port"));
    }

    #[test]
    fn errors_are_config_errors() {
        let err = check(&make_config("[data]\n")).unwrap_err();
        assert!(matches!(
            err,
            InsightError::ConfigMissing { .. } | InsightError::ConfigInvalid { .. }
        ));
    }

    #[test]
    fn string_list_splits_and_uppercases() {
        let config = with("[backtest]\nsymbols = aapl, msft,,ge \n");
        assert_eq!(
            string_list(&config, "backtest", "symbols"),
            vec!["AAPL", "MSFT", "GE"]
        );
        assert!(string_list(&config, "backtest", "missing").is_empty());
    }
}
