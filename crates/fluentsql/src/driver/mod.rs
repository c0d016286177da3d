//! Driver contract and the built-in drivers.
//!
//! A [`Driver`] knows how to open a [`Connection`] for one engine and how that
//! engine escapes string literals. The registry only ever talks to these two
//! traits; network I/O stays inside the driver.

use std::fmt;

use crate::dialect::EngineType;
use crate::dsn::Dsn;
use crate::error::SqlResult;
use crate::row::Row;

pub mod escape;
pub mod memory;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryDriver;
#[cfg(feature = "mysql")]
pub use mysql::MySqlDriver;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDriver;

/// Result of [`Connection::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// DML/DDL without a result set.
    Affected(u64),
    /// The statement produced a result set (`SELECT`, `... RETURNING`).
    Rows(Vec<Row>),
}

impl ExecOutcome {
    /// Affected rows, or the number of returned rows.
    pub fn count(&self) -> u64 {
        match self {
            Self::Affected(n) => *n,
            Self::Rows(rows) => rows.len() as u64,
        }
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Affected(_) => Vec::new(),
            Self::Rows(rows) => rows,
        }
    }
}

impl fmt::Display for ExecOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Affected(n) => write!(f, "{n} row(s) affected"),
            Self::Rows(rows) => write!(f, "{} row(s) returned", rows.len()),
        }
    }
}

/// A live connection handle.
pub trait Connection: Send {
    /// Run a statement; result sets come back as [`ExecOutcome::Rows`].
    fn execute(&mut self, sql: &str) -> SqlResult<ExecOutcome>;

    /// Run a statement and collect its rows (empty for DML).
    fn query(&mut self, sql: &str) -> SqlResult<Vec<Row>>;

    /// Close the connection.
    fn close(self: Box<Self>) -> SqlResult<()>;
}

/// Per-engine connection factory.
pub trait Driver: Send {
    fn engine(&self) -> EngineType;

    /// Open a connection; failures are [`crate::SqlError::Connection`] with
    /// the native error text.
    fn connect(&self, dsn: &Dsn) -> SqlResult<Box<dyn Connection>>;

    /// Escape a string literal body the way the engine does.
    fn escape(&self, value: &str) -> String;

    fn quote_identifier(&self, name: &str) -> String {
        self.engine().quote_identifier(name)
    }
}

/// Drivers compiled into this build, one per engine.
pub fn default_drivers() -> Vec<Box<dyn Driver>> {
    let mut drivers: Vec<Box<dyn Driver>> = Vec::new();
    #[cfg(feature = "mysql")]
    drivers.push(Box::new(MySqlDriver::new()));
    #[cfg(feature = "postgres")]
    drivers.push(Box::new(PostgresDriver::new()));
    drivers
}

/// Owned current-thread runtime used by the async-backed drivers.
#[cfg(any(feature = "postgres", feature = "mysql"))]
pub(crate) fn build_runtime() -> SqlResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| crate::error::SqlError::connection(format!("failed to start runtime: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_outcome_count() {
        assert_eq!(ExecOutcome::Affected(3).count(), 3);
        let rows = vec![Row::from_pairs([("a", Some("1"))])];
        let outcome = ExecOutcome::Rows(rows.clone());
        assert_eq!(outcome.count(), 1);
        assert_eq!(outcome.to_string(), "1 row(s) returned");
        assert_eq!(outcome.into_rows(), rows);
        assert!(ExecOutcome::Affected(0).into_rows().is_empty());
    }

    #[test]
    fn default_quote_identifier_follows_engine() {
        let driver = MemoryDriver::new(EngineType::Postgres);
        assert_eq!(driver.quote_identifier("app.users"), r#""app"."users""#);
    }
}
