//! Concrete adapter implementations for ports.

pub mod console_sink;
pub mod csv_adapter;
pub mod csv_sink;
pub mod file_config_adapter;
#[cfg(feature = "postgres")]
pub mod postgres_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
