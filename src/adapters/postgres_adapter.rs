//! PostgreSQL data adapter over the `company` / `stock_quote` schema.
//!
//! Connection settings come from an explicit [`PostgresConfig`]; there are no
//! baked-in credentials. Connections are pooled so scans can fetch series
//! from several worker threads.

use crate::domain::config_validation::{require_string, require_usize, usize_or, DEFAULT_POOL_SIZE};
use crate::domain::error::InsightError;
use crate::domain::ohlcv::Bar;
use crate::domain::series::Instrument;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use postgres::NoTls;
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;

const SELECT_COMPANIES_SQL: &str = "SELECT symbol, name, sector, industry, ipo_year \
     FROM company \
     ORDER BY symbol";

const SELECT_QUOTES_SQL: &str = "SELECT quo.quote_date, \
            quo.open::double precision, quo.high::double precision, \
            quo.low::double precision, quo.close::double precision, \
            quo.volume::bigint \
     FROM stock_quote quo JOIN company com ON com.id = quo.company_id \
     WHERE com.symbol = $1 \
     ORDER BY quo.quote_date ASC";

const SELECT_RANGE_SQL: &str = "SELECT MIN(quo.quote_date), MAX(quo.quote_date), COUNT(*) \
     FROM stock_quote quo JOIN company com ON com.id = quo.company_id \
     WHERE com.symbol = $1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_size: u32,
}

impl PostgresConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, InsightError> {
        let port = require_usize(config, "data", "port")?;
        let port = u16::try_from(port).map_err(|_| InsightError::ConfigInvalid {
            section: "data".into(),
            key: "port".into(),
            reason: format!("{port} is not a valid port"),
        })?;
        Ok(Self {
            host: require_string(config, "data", "host")?,
            port,
            database: require_string(config, "data", "database")?,
            user: require_string(config, "data", "user")?,
            password: require_string(config, "data", "password")?,
            pool_size: usize_or(config, "data", "pool_size", DEFAULT_POOL_SIZE)? as u32,
        })
    }

    fn client_config(&self) -> postgres::Config {
        let mut pg = postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .password(&self.password);
        pg
    }
}

pub struct PostgresAdapter {
    pool: Pool<PostgresConnectionManager<NoTls>>,
}

fn query_err(e: postgres::Error) -> InsightError {
    InsightError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl PostgresAdapter {
    pub fn connect(config: &PostgresConfig) -> Result<Self, InsightError> {
        let manager = PostgresConnectionManager::new(config.client_config(), NoTls);
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .build(manager)
            .map_err(|e| InsightError::Database {
                reason: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, InsightError> {
        Self::connect(&PostgresConfig::from_config(config)?)
    }

    fn conn(&self) -> Result<PooledConnection<PostgresConnectionManager<NoTls>>, InsightError> {
        self.pool.get().map_err(|e| InsightError::Database {
            reason: e.to_string(),
        })
    }
}

impl DataPort for PostgresAdapter {
    fn list_instruments(&self) -> Result<Vec<Instrument>, InsightError> {
        let rows = self
            .conn()?
            .query(SELECT_COMPANIES_SQL, &[])
            .map_err(query_err)?;

        Ok(rows
            .into_iter()
            .map(|row| Instrument {
                symbol: row.get(0),
                name: row.get(1),
                sector: row.get(2),
                industry: row.get(3),
                ipo_year: row.get(4),
            })
            .collect())
    }

    fn fetch_series(&self, symbol: &str) -> Result<Vec<Bar>, InsightError> {
        let rows = self
            .conn()?
            .query(SELECT_QUOTES_SQL, &[&symbol])
            .map_err(query_err)?;

        Ok(rows
            .into_iter()
            .map(|row| Bar {
                date: row.get(0),
                open: row.get(1),
                high: row.get(2),
                low: row.get(3),
                close: row.get(4),
                volume: row.get(5),
            })
            .collect())
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, InsightError> {
        let row = self
            .conn()?
            .query_one(SELECT_RANGE_SQL, &[&symbol])
            .map_err(query_err)?;

        let min: Option<NaiveDate> = row.get(0);
        let max: Option<NaiveDate> = row.get(1);
        let count: i64 = row.get(2);

        match (min, max) {
            (Some(min), Some(max)) if count > 0 => Ok(Some((min, max, count as usize))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    #[test]
    fn config_reads_data_section() {
        let config = FileConfigAdapter::from_string(
            "[data]\nprovider = postgres\nhost = db.local\nport = 5433\ndatabase = ps\nuser = reader\npassword = secret\n",
        )
        .unwrap();
        let pg = PostgresConfig::from_config(&config).unwrap();
        assert_eq!(
            pg,
            PostgresConfig {
                host: "db.local".into(),
                port: 5433,
                database: "ps".into(),
                user: "reader".into(),
                password: "secret".into(),
                pool_size: DEFAULT_POOL_SIZE as u32,
            }
        );
    }

    #[test]
    fn config_missing_password() {
        let config = FileConfigAdapter::from_string(
            "[data]\nhost = db.local\nport = 5432\ndatabase = ps\nuser = reader\n",
        )
        .unwrap();
        match PostgresConfig::from_config(&config) {
            Err(InsightError::ConfigMissing { section, key }) => {
                assert_eq!(section, "data");
                assert_eq!(key, "password");
            }
            other => panic!("expected ConfigMissing, got: {other:?}"),
        }
    }

    #[test]
    fn config_rejects_bad_port() {
        let config = FileConfigAdapter::from_string(
            "[data]\nhost = h\nport = 99999\ndatabase = d\nuser = u\npassword = p\n",
        )
        .unwrap();
        assert!(matches!(
            PostgresConfig::from_config(&config),
            Err(InsightError::ConfigInvalid { key, .. }) if key == "port"
        ));
    }
}
