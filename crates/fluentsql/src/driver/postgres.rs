//! PostgreSQL driver over `tokio-postgres`.
//!
//! Statements go through the simple-query (text) protocol, matching the
//! textual substitution the builders perform. Each connection owns a
//! current-thread runtime and blocks on it for every call.

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

use crate::dialect::EngineType;
use crate::driver::{Connection, Driver, ExecOutcome, build_runtime, escape};
use crate::dsn::Dsn;
use crate::error::{SqlError, SqlResult};
use crate::row::Row;

/// Connects with `NoTls`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

impl PostgresDriver {
    pub fn new() -> Self {
        Self
    }

    fn config(dsn: &Dsn) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&dsn.server)
            .dbname(&dsn.dbname)
            .user(&dsn.username)
            .password(&dsn.password)
            .application_name("fluentsql");
        if let Some(port) = dsn.port {
            config.port(port);
        }
        if let Some(options) = &dsn.options {
            config.options(options);
        }
        config
    }
}

impl Driver for PostgresDriver {
    fn engine(&self) -> EngineType {
        EngineType::Postgres
    }

    fn connect(&self, dsn: &Dsn) -> SqlResult<Box<dyn Connection>> {
        let runtime = build_runtime()?;
        let config = Self::config(dsn);
        let (client, connection) = runtime
            .block_on(config.connect(NoTls))
            .map_err(|e| SqlError::connection(e.to_string()))?;

        let server = dsn.server.clone();
        let task = runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(target: "fluentsql.registry", server = %server, error = %e, "postgres connection error");
            }
        });

        Ok(Box::new(PostgresConnection {
            runtime,
            client,
            task,
        }))
    }

    fn escape(&self, value: &str) -> String {
        escape::postgres(value)
    }
}

struct PostgresConnection {
    runtime: Runtime,
    client: Client,
    task: JoinHandle<()>,
}

impl PostgresConnection {
    fn simple_query(&mut self, sql: &str) -> SqlResult<Vec<SimpleQueryMessage>> {
        self.runtime
            .block_on(self.client.simple_query(sql))
            .map_err(SqlError::from_pg_error)
    }
}

/// Split simple-query messages into rows and the summed command count.
///
/// `has_result_set` is true when any statement described a result set, even
/// an empty one.
fn collect(messages: Vec<SimpleQueryMessage>) -> (Vec<Row>, u64, bool) {
    let mut rows = Vec::new();
    let mut affected = 0u64;
    let mut has_result_set = false;
    for message in messages {
        match message {
            SimpleQueryMessage::Row(row) => {
                has_result_set = true;
                let columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                let values = (0..row.len()).map(|i| row.get(i).map(str::to_string)).collect();
                rows.push(Row::new(columns, values));
            }
            SimpleQueryMessage::RowDescription(_) => has_result_set = true,
            SimpleQueryMessage::CommandComplete(n) => affected += n,
            _ => {}
        }
    }
    (rows, affected, has_result_set)
}

impl Connection for PostgresConnection {
    fn execute(&mut self, sql: &str) -> SqlResult<ExecOutcome> {
        let (rows, affected, has_result_set) = collect(self.simple_query(sql)?);
        if has_result_set {
            Ok(ExecOutcome::Rows(rows))
        } else {
            Ok(ExecOutcome::Affected(affected))
        }
    }

    fn query(&mut self, sql: &str) -> SqlResult<Vec<Row>> {
        let (rows, _, _) = collect(self.simple_query(sql)?);
        Ok(rows)
    }

    fn close(self: Box<Self>) -> SqlResult<()> {
        let Self {
            runtime,
            client,
            task,
        } = *self;
        drop(client);
        runtime
            .block_on(task)
            .map_err(|e| SqlError::connection(format!("postgres connection task failed: {e}")))
    }
}
