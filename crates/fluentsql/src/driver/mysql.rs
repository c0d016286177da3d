//! MySQL/MariaDB driver over `sqlx`.
//!
//! SQL is sent with `raw_sql` (text protocol, no prepared statements); every
//! connection owns a current-thread runtime.

use futures_util::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Column as _, ConnectOptions as _, Connection as _, Either, Row as _};
use tokio::runtime::Runtime;

use crate::dialect::EngineType;
use crate::driver::{Connection, Driver, ExecOutcome, build_runtime, escape};
use crate::dsn::Dsn;
use crate::error::{SqlError, SqlResult};
use crate::row::Row;

/// Default MySQL port when the DSN carries none.
pub const DEFAULT_PORT: u16 = 3306;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

impl MySqlDriver {
    pub fn new() -> Self {
        Self
    }

    fn options(dsn: &Dsn) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&dsn.server)
            .port(dsn.port.unwrap_or(DEFAULT_PORT))
            .database(&dsn.dbname)
            .username(&dsn.username)
            .password(&dsn.password)
    }
}

impl Driver for MySqlDriver {
    fn engine(&self) -> EngineType {
        EngineType::Mysql
    }

    fn connect(&self, dsn: &Dsn) -> SqlResult<Box<dyn Connection>> {
        let runtime = build_runtime()?;
        let conn = runtime
            .block_on(Self::options(dsn).connect())
            .map_err(|e| SqlError::connection(e.to_string()))?;
        Ok(Box::new(MySqlConn { runtime, conn }))
    }

    fn escape(&self, value: &str) -> String {
        escape::mysql(value)
    }
}

struct MySqlConn {
    runtime: Runtime,
    conn: MySqlConnection,
}

impl MySqlConn {
    /// Run `sql`, returning its rows and the summed affected count.
    fn run(&mut self, sql: &str) -> SqlResult<(Vec<Row>, u64)> {
        let Self { runtime, conn } = self;
        let results = runtime.block_on(async {
            sqlx::raw_sql(sql)
                .fetch_many(&mut *conn)
                .try_collect::<Vec<_>>()
                .await
        })?;

        let mut rows = Vec::new();
        let mut affected = 0u64;
        for item in results {
            match item {
                Either::Left(done) => affected += done.rows_affected(),
                Either::Right(row) => {
                    let mut columns = Vec::with_capacity(row.len());
                    let mut values = Vec::with_capacity(row.len());
                    for (i, column) in row.columns().iter().enumerate() {
                        let value = row
                            .try_get_unchecked::<Option<String>, _>(i)
                            .map_err(|e| SqlError::decode(column.name(), e.to_string()))?;
                        columns.push(column.name().to_string());
                        values.push(value);
                    }
                    rows.push(Row::new(columns, values));
                }
            }
        }
        Ok((rows, affected))
    }
}

impl Connection for MySqlConn {
    /// Rows are reported only when the statement returned at least one.
    fn execute(&mut self, sql: &str) -> SqlResult<ExecOutcome> {
        let (rows, affected) = self.run(sql)?;
        if rows.is_empty() {
            Ok(ExecOutcome::Affected(affected))
        } else {
            Ok(ExecOutcome::Rows(rows))
        }
    }

    fn query(&mut self, sql: &str) -> SqlResult<Vec<Row>> {
        Ok(self.run(sql)?.0)
    }

    fn close(self: Box<Self>) -> SqlResult<()> {
        let Self { runtime, conn } = *self;
        runtime
            .block_on(conn.close())
            .map_err(|e| SqlError::connection(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_escape_uses_backslashes() {
        assert_eq!(MySqlDriver::new().escape("it's\n"), r"it\'s\n");
    }

    #[test]
    fn unreachable_server_is_connection_error() {
        let dsn = Dsn::parse("host=127.0.0.1 port=1 dbname=app user=u password=p").unwrap();
        let err = MySqlDriver::new().connect(&dsn).err().unwrap();
        assert!(err.is_connection());
    }
}
