//! Top-level error type.

/// Errors surfaced by adapters, configuration, and the scan driver.
///
/// Indicator warm-up shortfalls never reach this type; see
/// [`IndicatorError`](crate::domain::indicator::IndicatorError).
#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("series for {symbol} is not strictly ascending: {reason}")]
    SeriesOrder { symbol: String, reason: String },

    #[error("output error: {reason}")]
    Output { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&InsightError> for std::process::ExitCode {
    fn from(err: &InsightError) -> Self {
        let code: u8 = match err {
            InsightError::Io(_) => 1,
            InsightError::ConfigParse { .. }
            | InsightError::ConfigMissing { .. }
            | InsightError::ConfigInvalid { .. } => 2,
            InsightError::Database { .. } | InsightError::DatabaseQuery { .. } => 3,
            InsightError::Output { .. } => 4,
            InsightError::NoData { .. } | InsightError::SeriesOrder { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
