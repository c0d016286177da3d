//! In-memory driver: scripted responses and a statement log.
//!
//! Useful for tests and dry runs. Clones share state, so keep one clone to
//! inspect what a registry ran after handing the other one over.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dialect::EngineType;
use crate::driver::{Connection, Driver, ExecOutcome};
use crate::dsn::Dsn;
use crate::error::{SqlError, SqlResult};
use crate::row::Row;

/// A statement seen by a memory connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedStatement {
    pub engine: EngineType,
    pub server: String,
    pub sql: String,
}

#[derive(Debug)]
enum Scripted {
    Outcome(ExecOutcome),
    Error(String),
}

#[derive(Debug, Default)]
struct MemoryState {
    responses: VecDeque<Scripted>,
    log: Vec<LoggedStatement>,
    refused: HashSet<String>,
    opened: Vec<String>,
    closed: Vec<String>,
}

/// Driver that never touches the network.
#[derive(Debug, Clone)]
pub struct MemoryDriver {
    engine: EngineType,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDriver {
    /// Impersonate `engine` (quoting and escaping follow it).
    pub fn new(engine: EngineType) -> Self {
        Self {
            engine,
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse connections to `server`.
    pub fn refuse(self, server: &str) -> Self {
        self.state().refused.insert(server.to_string());
        self
    }

    /// Queue rows for the next statement.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state()
            .responses
            .push_back(Scripted::Outcome(ExecOutcome::Rows(rows)));
    }

    /// Queue an affected-row count for the next statement.
    pub fn push_affected(&self, count: u64) {
        self.state()
            .responses
            .push_back(Scripted::Outcome(ExecOutcome::Affected(count)));
    }

    /// Make the next statement fail with `message`.
    pub fn push_error(&self, message: &str) {
        self.state()
            .responses
            .push_back(Scripted::Error(message.to_string()));
    }

    /// Every statement run so far, oldest first.
    pub fn log(&self) -> Vec<LoggedStatement> {
        self.state().log.clone()
    }

    /// SQL text of every statement run so far.
    pub fn statements(&self) -> Vec<String> {
        self.state().log.iter().map(|s| s.sql.clone()).collect()
    }

    /// Servers connected to, in connect order.
    pub fn opened(&self) -> Vec<String> {
        self.state().opened.clone()
    }

    /// Servers whose connections were closed, in close order.
    pub fn closed(&self) -> Vec<String> {
        self.state().closed.clone()
    }
}

impl Driver for MemoryDriver {
    fn engine(&self) -> EngineType {
        self.engine
    }

    fn connect(&self, dsn: &Dsn) -> SqlResult<Box<dyn Connection>> {
        let mut state = self.state();
        if state.refused.contains(&dsn.server) {
            return Err(SqlError::connection(format!(
                "could not connect to server \"{}\": connection refused",
                dsn.server
            )));
        }
        state.opened.push(dsn.server.clone());
        Ok(Box::new(MemoryConnection {
            engine: self.engine,
            server: dsn.server.clone(),
            state: Arc::clone(&self.state),
        }))
    }

    fn escape(&self, value: &str) -> String {
        self.engine.escape(value)
    }
}

struct MemoryConnection {
    engine: EngineType,
    server: String,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnection {
    fn run(&mut self, sql: &str) -> SqlResult<Option<ExecOutcome>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.log.push(LoggedStatement {
            engine: self.engine,
            server: self.server.clone(),
            sql: sql.to_string(),
        });
        match state.responses.pop_front() {
            Some(Scripted::Outcome(outcome)) => Ok(Some(outcome)),
            Some(Scripted::Error(message)) => Err(SqlError::execution(message)),
            None => Ok(None),
        }
    }
}

impl Connection for MemoryConnection {
    fn execute(&mut self, sql: &str) -> SqlResult<ExecOutcome> {
        Ok(self.run(sql)?.unwrap_or(ExecOutcome::Affected(0)))
    }

    fn query(&mut self, sql: &str) -> SqlResult<Vec<Row>> {
        Ok(self.run(sql)?.map(ExecOutcome::into_rows).unwrap_or_default())
    }

    fn close(self: Box<Self>) -> SqlResult<()> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
            .push(self.server.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dsn(server: &str) -> Dsn {
        Dsn::parse(&format!("host={server} dbname=app user=u password=p port=5432")).unwrap()
    }

    #[test]
    fn scripted_responses_in_order() {
        let driver = MemoryDriver::new(EngineType::Postgres);
        driver.push_rows(vec![Row::from_pairs([("n", Some("1"))])]);
        driver.push_affected(4);
        driver.push_error("relation \"nope\" does not exist");

        let mut conn = driver.connect(&dsn("db1")).unwrap();
        assert_eq!(conn.query("SELECT 1 AS n").unwrap()[0].get("n"), Some("1"));
        assert_eq!(conn.execute("DELETE FROM t").unwrap(), ExecOutcome::Affected(4));
        assert!(conn.execute("SELECT * FROM nope").unwrap_err().is_execution());
        assert_eq!(conn.execute("UPDATE t SET a = 1").unwrap(), ExecOutcome::Affected(0));
        assert_eq!(driver.statements().len(), 4);
        assert_eq!(driver.log()[0].server, "db1");
    }

    #[test]
    fn refused_server_fails_connect() {
        let driver = MemoryDriver::new(EngineType::Mysql).refuse("down");
        let err = driver.connect(&dsn("down")).err().unwrap();
        assert!(err.is_connection());
        assert!(err.to_string().contains("connection refused"));
        assert!(driver.opened().is_empty());
    }

    #[test]
    fn close_is_recorded() {
        let driver = MemoryDriver::new(EngineType::Mysql);
        let conn = driver.connect(&dsn("db1")).unwrap();
        conn.close().unwrap();
        assert_eq!(driver.closed(), vec!["db1".to_string()]);
    }

    #[test]
    fn escape_follows_engine() {
        assert_eq!(MemoryDriver::new(EngineType::Mysql).escape("a'b"), r"a\'b");
        assert_eq!(MemoryDriver::new(EngineType::Postgres).escape("a'b"), "a''b");
    }
}
