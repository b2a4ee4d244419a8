//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::adapters::console_sink::ConsoleSink;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_sink::CsvSink;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    bool_or, f64_or, require_f64, require_string, require_usize, scan_mode, strategy_kind,
    string_list, usize_or, validate_scan_config,
};
use crate::domain::error::InsightError;
use crate::domain::scan::{
    ScanConfig, ScanMode, ScanSummary, Scanner, DEFAULT_FUTURE_WINDOW, DEFAULT_LIVE_LOOKBACK,
    DEFAULT_PAST_WINDOW,
};
use crate::domain::strategy::config::{
    DEFAULT_CLOSENESS_WINDOW, DEFAULT_PREVIOUS_WINDOW, DEFAULT_VOLATILITY_RATIO,
};
use crate::domain::strategy::{
    BaseFilterConfig, BigSpikeParams, StableBreakParams, Strategy, StrategyConfig, StrategyKind,
    StrategyParams,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::signal_port::SignalSink;

#[derive(Parser, Debug)]
#[command(name = "stockinsight", about = "Rule-based stock signal scanner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan every instrument for strategy signals
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        /// Override [strategy] name
        #[arg(short, long)]
        strategy: Option<StrategyKind>,
        /// Override [strategy] mode
        #[arg(short, long)]
        mode: Option<ScanMode>,
        /// Restrict the scan to these symbols (repeatable)
        #[arg(long = "symbol")]
        symbols: Vec<String>,
        /// Write signals as CSV instead of text lines on stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Validate a configuration and print the resolved settings
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<StrategyKind>,
    },
    /// List instruments known to the data provider
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show bar count and date range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long = "symbol", required = true)]
        symbols: Vec<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Scan {
            config,
            strategy,
            mode,
            symbols,
            output,
            workers,
        } => run_scan(&config, strategy, mode, &symbols, output.as_deref(), workers),
        Command::Validate { config, strategy } => run_validate(&config, strategy),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Info { config, symbols } => run_info(&config, &symbols),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, InsightError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataProvider {
    Csv,
    Sqlite,
    Postgres,
}

impl fmt::Display for DataProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataProvider::Csv => write!(f, "csv"),
            DataProvider::Sqlite => write!(f, "sqlite"),
            DataProvider::Postgres => write!(f, "postgres"),
        }
    }
}

impl FromStr for DataProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(DataProvider::Csv),
            "sqlite" => Ok(DataProvider::Sqlite),
            "postgres" | "postgresql" => Ok(DataProvider::Postgres),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

pub fn build_data_provider(config: &dyn ConfigPort) -> Result<DataProvider, InsightError> {
    require_string(config, "data", "provider")?
        .parse()
        .map_err(|reason| InsightError::ConfigInvalid {
            section: "data".into(),
            key: "provider".into(),
            reason,
        })
}

pub fn build_base_filter(config: &dyn ConfigPort) -> Result<BaseFilterConfig, InsightError> {
    Ok(BaseFilterConfig {
        ob_window: require_usize(config, "base_filter", "ob_window")?,
        min_price: require_f64(config, "base_filter", "min_price")?,
        min_volume: require_f64(config, "base_filter", "min_volume")?,
        require_volatility: bool_or(config, "base_filter", "require_volatility", false)?,
        volatility_ratio: f64_or(
            config,
            "base_filter",
            "volatility_ratio",
            DEFAULT_VOLATILITY_RATIO,
        )?,
    })
}

pub fn build_strategy_config(
    config: &dyn ConfigPort,
    strategy_override: Option<StrategyKind>,
) -> Result<StrategyConfig, InsightError> {
    let kind = match strategy_override {
        Some(kind) => kind,
        None => strategy_kind(config)?,
    };
    let section = kind.section();
    let params = match kind {
        StrategyKind::BigSpike => StrategyParams::BigSpike(BigSpikeParams {
            ob_window: require_usize(config, section, "ob_window")?,
            rule_3_volume: require_f64(config, section, "rule_3_volume")?,
            rule_8_horizon: require_usize(config, section, "rule_8_horizon")?,
            rule_8_volume_multiple: require_f64(config, section, "rule_8_volume_multiple")?,
        }),
        StrategyKind::StableBreak => StrategyParams::StableBreak(StableBreakParams {
            closeness_window: usize_or(
                config,
                section,
                "closeness_window",
                DEFAULT_CLOSENESS_WINDOW,
            )?,
            previous_window: usize_or(config, section, "previous_window", DEFAULT_PREVIOUS_WINDOW)?,
        }),
    };
    Ok(StrategyConfig {
        base_filter: build_base_filter(config)?,
        params,
    })
}

pub fn build_scan_config(
    config: &dyn ConfigPort,
    mode_override: Option<ScanMode>,
    symbols_override: &[String],
) -> Result<ScanConfig, InsightError> {
    let mode = match mode_override {
        Some(mode) => mode,
        None => scan_mode(config)?,
    };
    let timeout_secs = usize_or(config, "backtest", "timeout_secs", 0)? as u64;
    let symbols = if symbols_override.is_empty() {
        string_list(config, "backtest", "symbols")
    } else {
        symbols_override
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect()
    };

    Ok(ScanConfig {
        mode,
        past_window: usize_or(config, "backtest", "past_window", DEFAULT_PAST_WINDOW)?,
        future_window: usize_or(config, "backtest", "future_window", DEFAULT_FUTURE_WINDOW)?,
        live_lookback: usize_or(config, "backtest", "live_lookback", DEFAULT_LIVE_LOOKBACK)?,
        workers: usize_or(config, "backtest", "workers", 1)?,
        timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        symbols,
    })
}

/// Opens the configured provider. Call only after validation.
pub fn open_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort + Sync>, InsightError> {
    let provider = build_data_provider(config)?;
    info!(%provider, "opening data provider");
    match provider {
        DataProvider::Csv => {
            let path = require_string(config, "data", "path")?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(path))))
        }
        #[cfg(feature = "sqlite")]
        DataProvider::Sqlite => {
            use crate::adapters::sqlite_adapter::SqliteAdapter;
            Ok(Box::new(SqliteAdapter::from_config(config)?))
        }
        #[cfg(feature = "postgres")]
        DataProvider::Postgres => {
            use crate::adapters::postgres_adapter::PostgresAdapter;
            Ok(Box::new(PostgresAdapter::from_config(config)?))
        }
        #[allow(unreachable_patterns)]
        other => Err(InsightError::ConfigInvalid {
            section: "data".into(),
            key: "provider".into(),
            reason: format!("built without the {other} feature"),
        }),
    }
}

pub fn run_scan_pipeline(
    data_port: &(dyn DataPort + Sync),
    strategy_config: &StrategyConfig,
    scan_config: &ScanConfig,
    sink: &mut dyn SignalSink,
) -> Result<ScanSummary, InsightError> {
    let strategy = Strategy::from_config(strategy_config);
    let scanner = Scanner::new(strategy, scan_config.clone());
    scanner.run(data_port, sink)
}

fn run_scan(
    config_path: &Path,
    strategy_override: Option<StrategyKind>,
    mode_override: Option<ScanMode>,
    symbols: &[String],
    output_path: Option<&Path>,
    workers: Option<usize>,
) -> Result<ExitCode, InsightError> {
    let config = load_config(config_path)?;

    // Everything is checked before a provider connection is attempted.
    validate_scan_config(&config, strategy_override, mode_override)?;
    let strategy_config = build_strategy_config(&config, strategy_override)?;
    let mut scan_config = build_scan_config(&config, mode_override, symbols)?;
    if let Some(workers) = workers {
        if workers == 0 {
            return Err(InsightError::ConfigInvalid {
                section: "backtest".into(),
                key: "workers".into(),
                reason: "workers must be at least 1".into(),
            });
        }
        scan_config.workers = workers;
    }
    let data_port = open_data_port(&config)?;

    let summary = match output_path {
        Some(path) => {
            let mut sink = CsvSink::create(path)?;
            let summary = run_scan_pipeline(
                data_port.as_ref(),
                &strategy_config,
                &scan_config,
                &mut sink,
            )?;
            eprintln!("Signals written to: {}", path.display());
            summary
        }
        None => {
            let mut sink = ConsoleSink::stdout();
            run_scan_pipeline(data_port.as_ref(), &strategy_config, &scan_config, &mut sink)?
        }
    };

    print_summary(&summary);
    Ok(ExitCode::SUCCESS)
}

fn print_summary(summary: &ScanSummary) {
    eprintln!("\n=== Scan Summary ===");
    eprintln!("Instruments:      {}", summary.instruments);
    eprintln!("Scanned:          {}", summary.scanned);
    eprintln!("Signals:          {}", summary.signals);
    if let Some(rate) = summary.win_rate() {
        eprintln!("Hold Win Rate:    {:.1}%", rate * 100.0);
    }
    if !summary.skipped.is_empty() {
        eprintln!("Skipped:          {}", summary.skipped.len());
        for skipped in &summary.skipped {
            eprintln!("  {}: {}", skipped.symbol, skipped.reason);
        }
    }
}

fn run_validate(
    config_path: &Path,
    strategy_override: Option<StrategyKind>,
) -> Result<ExitCode, InsightError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;
    validate_scan_config(&config, strategy_override, None)?;

    let strategy_config = build_strategy_config(&config, strategy_override)?;
    let scan_config = build_scan_config(&config, None, &[])?;
    let provider = build_data_provider(&config)?;

    let base = &strategy_config.base_filter;
    eprintln!("\nBase filter:");
    eprintln!("  ob_window:          {}", base.ob_window);
    eprintln!("  min_price:          {}", base.min_price);
    eprintln!("  min_volume:         {}", base.min_volume);
    if base.require_volatility {
        eprintln!("  volatility_ratio:   {}", base.volatility_ratio);
    }

    eprintln!("\nStrategy: {}", strategy_config.params.kind());
    match &strategy_config.params {
        StrategyParams::BigSpike(p) => {
            eprintln!("  ob_window:              {}", p.ob_window);
            eprintln!("  rule_3_volume:          {}", p.rule_3_volume);
            eprintln!("  rule_8_horizon:         {}", p.rule_8_horizon);
            eprintln!("  rule_8_volume_multiple: {}", p.rule_8_volume_multiple);
        }
        StrategyParams::StableBreak(p) => {
            eprintln!("  closeness_window:       {}", p.closeness_window);
            eprintln!("  previous_window:        {}", p.previous_window);
        }
    }

    eprintln!("\nScan: {}", scan_config.mode);
    match scan_config.mode {
        ScanMode::Backtest => {
            eprintln!("  past_window:    {}", scan_config.past_window);
            eprintln!("  future_window:  {}", scan_config.future_window);
        }
        ScanMode::Live => eprintln!("  live_lookback:  {}", scan_config.live_lookback),
    }
    eprintln!("  workers:        {}", scan_config.workers);
    if let Some(timeout) = scan_config.timeout {
        eprintln!("  timeout:        {}s", timeout.as_secs());
    }
    if !scan_config.symbols.is_empty() {
        eprintln!("  symbols:        {}", scan_config.symbols.join(", "));
    }
    eprintln!("\nData provider: {}", provider);

    eprintln!("\nConfiguration is valid.");
    Ok(ExitCode::SUCCESS)
}

fn run_list_symbols(config_path: &Path) -> Result<ExitCode, InsightError> {
    let config = load_config(config_path)?;
    let data_port = open_data_port(&config)?;
    let instruments = data_port.list_instruments()?;

    if instruments.is_empty() {
        eprintln!("No instruments found");
    } else {
        for inst in &instruments {
            match &inst.sector {
                Some(sector) => println!("{}\t{}\t{}", inst.symbol, inst.name, sector),
                None => println!("{}\t{}", inst.symbol, inst.name),
            }
        }
        eprintln!("{} instruments found", instruments.len());
    }
    Ok(ExitCode::SUCCESS)
}

fn run_info(config_path: &Path, symbols: &[String]) -> Result<ExitCode, InsightError> {
    let config = load_config(config_path)?;
    let data_port = open_data_port(&config)?;

    for symbol in symbols {
        let symbol = symbol.trim().to_uppercase();
        match data_port.get_data_range(&symbol) {
            Ok(Some((first, last, count))) => {
                println!("{}: {} bars, {} to {}", symbol, count, first, last);
            }
            Ok(None) => eprintln!("{}: no data found", symbol),
            Err(e) => eprintln!("error querying {}: {}", symbol, e),
        }
    }
    Ok(ExitCode::SUCCESS)
}
