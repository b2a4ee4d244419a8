//! SQLite data adapter over the `company` / `stock_quote` schema.

use crate::domain::config_validation::{require_string, usize_or, DEFAULT_POOL_SIZE};
use crate::domain::error::InsightError;
use crate::domain::ohlcv::Bar;
use crate::domain::series::Instrument;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

const SELECT_COMPANIES_SQL: &str = "SELECT symbol, name, sector, industry, ipo_year
     FROM company
     ORDER BY symbol";

const SELECT_QUOTES_SQL: &str = "SELECT quo.quote_date, quo.open, quo.high, quo.low, quo.close, quo.volume
     FROM stock_quote quo JOIN company com ON com.id = quo.company_id
     WHERE com.symbol = ?1
     ORDER BY quo.quote_date ASC";

const SELECT_RANGE_SQL: &str = "SELECT MIN(quo.quote_date), MAX(quo.quote_date), COUNT(*)
     FROM stock_quote quo JOIN company com ON com.id = quo.company_id
     WHERE com.symbol = ?1";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: r2d2::Error) -> InsightError {
    InsightError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> InsightError {
    InsightError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, InsightError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| InsightError::Database {
        reason: format!("invalid quote_date '{}': {}", value, e),
    })
}

impl SqliteAdapter {
    /// Opens `[data] path` with a pool of `[data] pool_size` connections.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, InsightError> {
        let db_path = require_string(config, "data", "path")?;
        let pool_size = usize_or(config, "data", "pool_size", DEFAULT_POOL_SIZE)? as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, InsightError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, InsightError> {
        self.pool.get().map_err(db_err)
    }

    pub fn initialize_schema(&self) -> Result<(), InsightError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS company (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    symbol TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    ipo_year INTEGER,
                    sector TEXT,
                    industry TEXT
                );
                CREATE TABLE IF NOT EXISTS stock_quote (
                    company_id INTEGER NOT NULL REFERENCES company(id),
                    quote_date TEXT NOT NULL,
                    open REAL NOT NULL,
                    close REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    volume INTEGER NOT NULL,
                    PRIMARY KEY (company_id, quote_date)
                );
                CREATE INDEX IF NOT EXISTS idx_stock_quote_date ON stock_quote(quote_date);",
            )
            .map_err(query_err)
    }

    /// Inserts or updates a company row and returns its id.
    pub fn insert_company(&self, instrument: &Instrument) -> Result<i64, InsightError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO company (symbol, name, ipo_year, sector, industry)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(symbol) DO UPDATE SET
                name = excluded.name,
                ipo_year = excluded.ipo_year,
                sector = excluded.sector,
                industry = excluded.industry",
            params![
                instrument.symbol,
                instrument.name,
                instrument.ipo_year,
                instrument.sector,
                instrument.industry
            ],
        )
        .map_err(query_err)?;

        conn.query_row(
            "SELECT id FROM company WHERE symbol = ?1",
            params![instrument.symbol],
            |row| row.get(0),
        )
        .map_err(query_err)
    }

    pub fn insert_bars(&self, symbol: &str, bars: &[Bar]) -> Result<(), InsightError> {
        let mut conn = self.conn()?;
        let company_id: i64 = conn
            .query_row(
                "SELECT id FROM company WHERE symbol = ?1",
                params![symbol],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)?
            .ok_or_else(|| InsightError::NoData {
                symbol: symbol.to_string(),
            })?;

        let tx = conn.transaction().map_err(query_err)?;
        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO stock_quote
                    (company_id, quote_date, open, close, high, low, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    company_id,
                    bar.date.format("%Y-%m-%d").to_string(),
                    bar.open,
                    bar.close,
                    bar.high,
                    bar.low,
                    bar.volume
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }
}

impl DataPort for SqliteAdapter {
    fn list_instruments(&self) -> Result<Vec<Instrument>, InsightError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(SELECT_COMPANIES_SQL).map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Instrument {
                    symbol: row.get(0)?,
                    name: row.get(1)?,
                    sector: row.get(2)?,
                    industry: row.get(3)?,
                    ipo_year: row.get(4)?,
                })
            })
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn fetch_series(&self, symbol: &str) -> Result<Vec<Bar>, InsightError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(SELECT_QUOTES_SQL).map_err(query_err)?;
        let rows = stmt
            .query_map(params![symbol], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })
            .map_err(query_err)?;

        let mut bars = Vec::new();
        for row in rows {
            let (date, open, high, low, close, volume) = row.map_err(query_err)?;
            bars.push(Bar {
                date: parse_date(&date)?,
                open,
                high,
                low,
                close,
                volume,
            });
        }
        Ok(bars)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, InsightError> {
        let result: (Option<String>, Option<String>, i64) = self
            .conn()?
            .query_row(SELECT_RANGE_SQL, params![symbol], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(query_err)?;

        match result {
            (Some(min), Some(max), count) if count > 0 => {
                Ok(Some((parse_date(&min)?, parse_date(&max)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}
