//! Connection registry.
//!
//! The registry owns every live connection, keyed by engine and host, and
//! tracks which one is current. Builders never hold a reference to it; they
//! render against it as a [`SqlContext`] and hand the SQL back for execution.
//!
//! ```ignore
//! let mut registry = ConnectionRegistry::new();
//! registry.setup("mysql", "host=db1 dbname=app user=app password=secret")?;
//! registry.setup("postgres", "host=db2 port=5432 dbname=app user=app password=secret")?;
//! registry.switch_server(EngineType::Mysql, "db1")?;
//! assert_eq!(registry.current_dialect(), EngineType::Mysql);
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::dialect::{EngineType, SqlContext};
use crate::driver::{self, Connection, Driver, ExecOutcome};
use crate::dsn::{Dsn, IntoDsn};
use crate::error::{SqlError, SqlResult};
use crate::row::Row;
use crate::trace::SqlTracer;

/// Table-name preformat hook, applied to the bare table segment.
pub type TableHook = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Registry key of one connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey {
    pub engine: EngineType,
    pub server: String,
}

impl ConnectionKey {
    pub fn new(engine: EngineType, server: &str) -> Self {
        Self {
            engine,
            server: server.trim().to_string(),
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.engine, self.server)
    }
}

struct Entry {
    key: ConnectionKey,
    dsn: Dsn,
    conn: Box<dyn Connection>,
}

/// Owns live connections and the current-connection pointer.
pub struct ConnectionRegistry {
    drivers: HashMap<EngineType, Box<dyn Driver>>,
    /// Entries in registration order.
    entries: Vec<Entry>,
    current: Option<ConnectionKey>,
    default_engine: EngineType,
    table_hook: Option<TableHook>,
    tracer: SqlTracer,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// Registry with the drivers compiled into this build.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for driver in driver::default_drivers() {
            registry.register_driver(driver);
        }
        registry
    }

    /// Registry without any driver.
    pub fn empty() -> Self {
        Self {
            drivers: HashMap::new(),
            entries: Vec::new(),
            current: None,
            default_engine: EngineType::Mysql,
            table_hook: None,
            tracer: SqlTracer::default(),
        }
    }

    /// Install (or replace) the driver for its engine.
    pub fn with_driver(mut self, driver: Box<dyn Driver>) -> Self {
        self.register_driver(driver);
        self
    }

    pub fn register_driver(&mut self, driver: Box<dyn Driver>) {
        self.drivers.insert(driver.engine(), driver);
    }

    /// Engine used for rendering while no connection is current.
    pub fn set_default_engine(&mut self, engine: EngineType) {
        self.default_engine = engine;
    }

    /// Install the table-name preformat hook.
    pub fn set_table_hook(&mut self, hook: impl Fn(&str) -> String + Send + Sync + 'static) {
        self.table_hook = Some(Box::new(hook));
    }

    /// Prefix every table name with `prefix`.
    pub fn set_table_prefix(&mut self, prefix: &str) {
        let prefix = prefix.to_string();
        self.set_table_hook(move |name| format!("{prefix}{name}"));
    }

    pub fn clear_table_hook(&mut self) {
        self.table_hook = None;
    }

    pub fn set_tracer(&mut self, tracer: SqlTracer) {
        self.tracer = tracer;
    }

    // ==================== Setup ====================

    /// Connect one `(type, dsn)` pair given in their string forms.
    pub fn setup(&mut self, engine: &str, dsn: &str) -> SqlResult<()> {
        if engine.trim().is_empty() || dsn.trim().is_empty() {
            return Err(SqlError::config("Type and / or Dsn is empty on setup"));
        }
        let engine: EngineType = engine.parse()?;
        self.connect(engine, dsn)
    }

    /// Connect every `(type, dsn)` pair in order; all or nothing.
    ///
    /// When one connection fails, the ones opened earlier in this call are
    /// closed again, connections they replaced are put back, and the previous
    /// current connection is restored.
    pub fn setup_many<I, D>(&mut self, entries: I) -> SqlResult<()>
    where
        I: IntoIterator<Item = (EngineType, D)>,
        D: IntoDsn,
    {
        let previous = self.current.clone();
        let mut opened: Vec<(ConnectionKey, Option<Entry>)> = Vec::new();

        for (engine, dsn) in entries {
            let result = dsn.into_dsn().and_then(|dsn| {
                let key = ConnectionKey::new(engine, dsn.host());
                self.install(engine, dsn).map_err(|e| {
                    if e.is_connection() {
                        SqlError::connection(format!(
                            "Unable to connect to database for {} on dsn: {}: {}",
                            key.engine,
                            key.server,
                            e.message()
                        ))
                    } else {
                        e
                    }
                })
            });

            match result {
                Ok(installed) => opened.push(installed),
                Err(e) => {
                    for (key, displaced) in opened.into_iter().rev() {
                        self.roll_back(key, displaced);
                    }
                    self.current = previous.filter(|k| self.position(k).is_some());
                    return Err(e);
                }
            }
        }

        for (key, displaced) in opened {
            if let Some(old) = displaced {
                close_replaced(&key, old);
            }
        }
        Ok(())
    }

    /// Parse and validate `dsn`, open a connection and make it current.
    ///
    /// An existing connection under the same `(engine, host)` is replaced and
    /// closed.
    pub fn connect(&mut self, engine: EngineType, dsn: impl IntoDsn) -> SqlResult<()> {
        let (key, displaced) = self.install(engine, dsn.into_dsn()?)?;
        if let Some(old) = displaced {
            close_replaced(&key, old);
        }
        Ok(())
    }

    /// Open a connection for `dsn`, register it and make it current.
    ///
    /// Returns the entry it replaced, still open.
    fn install(&mut self, engine: EngineType, dsn: Dsn) -> SqlResult<(ConnectionKey, Option<Entry>)> {
        dsn.validate(engine)?;

        let driver = self
            .drivers
            .get(&engine)
            .ok_or_else(|| SqlError::config(format!("No driver registered for {engine}")))?;
        let conn = driver.connect(&dsn).map_err(|e| match e {
            SqlError::Connection(_) => e,
            other => SqlError::connection(other.to_string()),
        })?;

        let key = ConnectionKey::new(engine, dsn.host());
        let entry = Entry {
            key: key.clone(),
            dsn,
            conn,
        };
        let displaced = match self.position(&key) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx], entry)),
            None => {
                self.entries.push(entry);
                None
            }
        };

        tracing::info!(target: "fluentsql.registry", engine = %key.engine, server = %key.server, "connected");
        self.current = Some(key.clone());
        Ok((key, displaced))
    }

    /// Undo one [`install`](Self::install): close the new connection and put
    /// back the one it replaced.
    fn roll_back(&mut self, key: ConnectionKey, displaced: Option<Entry>) {
        let Some(idx) = self.position(&key) else {
            return;
        };
        let new = match displaced {
            Some(old) => std::mem::replace(&mut self.entries[idx], old),
            None => self.entries.remove(idx),
        };
        if let Err(e) = new.conn.close() {
            tracing::warn!(target: "fluentsql.registry", key = %key, error = %e, "rollback close failed");
        }
    }

    /// Make `(engine, host)` the current connection.
    pub fn switch_server(&mut self, engine: EngineType, host: &str) -> SqlResult<()> {
        let key = ConnectionKey::new(engine, host);
        if self.position(&key).is_none() {
            return Err(SqlError::connection(format!(
                "No connection registered for type={} server={}",
                key.engine, key.server
            )));
        }
        tracing::info!(target: "fluentsql.registry", engine = %key.engine, server = %key.server, "switched server");
        self.current = Some(key);
        Ok(())
    }

    /// Close and forget `(engine, host)`.
    pub fn disconnect(&mut self, engine: EngineType, host: &str) -> SqlResult<()> {
        let key = ConnectionKey::new(engine, host);
        let Some(idx) = self.position(&key) else {
            return Err(SqlError::connection(format!(
                "No connection registered for type={} server={}",
                key.engine, key.server
            )));
        };
        let entry = self.entries.remove(idx);
        if self.current.as_ref() == Some(&key) {
            self.current = None;
        }
        entry.conn.close()
    }

    /// Close every connection; the first close error is returned after all
    /// connections were attempted.
    pub fn close_all(&mut self) -> SqlResult<()> {
        self.current = None;
        let mut first_error = None;
        for entry in self.entries.drain(..) {
            if let Err(e) = entry.conn.close() {
                tracing::warn!(target: "fluentsql.registry", key = %entry.key, error = %e, "failed to close connection");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ==================== Introspection ====================

    fn position(&self, key: &ConnectionKey) -> Option<usize> {
        self.entries.iter().position(|e| &e.key == key)
    }

    /// Registered connection keys, in registration order.
    pub fn connections(&self) -> Vec<ConnectionKey> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    pub fn current(&self) -> Option<&ConnectionKey> {
        self.current.as_ref()
    }

    /// DSN a connection was opened with.
    pub fn dsn(&self, engine: EngineType, host: &str) -> Option<&Dsn> {
        let key = ConnectionKey::new(engine, host);
        self.position(&key).map(|idx| &self.entries[idx].dsn)
    }

    /// Engine of the current connection, or the default engine.
    pub fn current_dialect(&self) -> EngineType {
        self.current
            .as_ref()
            .map_or(self.default_engine, |k| k.engine)
    }

    /// Escape with the current engine's driver.
    pub fn escape(&self, value: &str) -> String {
        let engine = self.current_dialect();
        match self.drivers.get(&engine) {
            Some(driver) => driver.escape(value),
            None => engine.escape(value),
        }
    }

    /// Quote an identifier for the current engine.
    pub fn quote_identifier(&self, name: &str) -> String {
        let engine = self.current_dialect();
        match self.drivers.get(&engine) {
            Some(driver) => driver.quote_identifier(name),
            None => engine.quote_identifier(name),
        }
    }

    // ==================== Execution ====================

    fn current_entry(&mut self) -> SqlResult<&mut Entry> {
        let Some(key) = &self.current else {
            return Err(SqlError::connection("No current connection; call setup or connect first"));
        };
        let idx = self
            .entries
            .iter()
            .position(|e| &e.key == key)
            .ok_or_else(|| SqlError::connection(format!("Current connection {key} is gone")))?;
        Ok(&mut self.entries[idx])
    }

    /// Run `sql` on the current connection.
    pub fn execute(&mut self, sql: &str) -> SqlResult<ExecOutcome> {
        let tracer = self.tracer.clone();
        let entry = self.current_entry()?;
        tracer.emit(entry.key.engine, &entry.key.server, "execute", sql);
        entry.conn.execute(sql)
    }

    /// Run `sql` on the current connection and collect its rows.
    pub fn query(&mut self, sql: &str) -> SqlResult<Vec<Row>> {
        let tracer = self.tracer.clone();
        let entry = self.current_entry()?;
        tracer.emit(entry.key.engine, &entry.key.server, "query", sql);
        entry.conn.query(sql)
    }
}

impl SqlContext for ConnectionRegistry {
    fn engine(&self) -> EngineType {
        self.current_dialect()
    }

    fn escape(&self, value: &str) -> String {
        ConnectionRegistry::escape(self, value)
    }

    fn preformat_table(&self, name: &str) -> String {
        match &self.table_hook {
            Some(hook) => hook(name),
            None => name.to_string(),
        }
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .field("connections", &self.connections())
            .field("current", &self.current)
            .field("default_engine", &self.default_engine)
            .field("table_hook", &self.table_hook.is_some())
            .finish()
    }
}

impl Drop for ConnectionRegistry {
    fn drop(&mut self) {
        // close_all already logs each failure
        let _ = self.close_all();
    }
}

fn close_replaced(key: &ConnectionKey, old: Entry) {
    if let Err(e) = old.conn.close() {
        tracing::warn!(target: "fluentsql.registry", key = %key, error = %e, "failed to close replaced connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryDriver;

    const MYSQL_DSN: &str = "host=db1 dbname=app user=u password=p";
    const PG_DSN: &str = "host=db2 port=5432 dbname=app user=u password=p";

    fn registry() -> (ConnectionRegistry, MemoryDriver, MemoryDriver) {
        let mysql = MemoryDriver::new(EngineType::Mysql);
        let pg = MemoryDriver::new(EngineType::Postgres);
        let registry = ConnectionRegistry::empty()
            .with_driver(Box::new(mysql.clone()))
            .with_driver(Box::new(pg.clone()));
        (registry, mysql, pg)
    }

    #[test]
    fn switch_restores_dialect() {
        let (mut reg, _, _) = registry();
        reg.setup("mysql", MYSQL_DSN).unwrap();
        reg.setup("postgres", PG_DSN).unwrap();
        assert_eq!(reg.current_dialect(), EngineType::Postgres);
        assert_eq!(reg.quote_identifier("a.b"), r#""a"."b""#);

        reg.switch_server(EngineType::Mysql, "db1").unwrap();
        assert_eq!(reg.current_dialect(), EngineType::Mysql);
        assert_eq!(reg.quote_identifier("a.b"), "`a`.`b`");
        assert_eq!(reg.escape("it's"), r"it\'s");
    }

    #[test]
    fn setup_rejects_empty_arguments() {
        let (mut reg, _, _) = registry();
        let err = reg.setup("", MYSQL_DSN).unwrap_err();
        assert_eq!(err.to_string(), "Config error: Type and / or Dsn is empty on setup");
        assert!(reg.setup("mysql", " ").unwrap_err().is_config());
        assert!(reg.setup("oracle", MYSQL_DSN).unwrap_err().is_config());
    }

    #[test]
    fn connect_validates_dsn_before_driver() {
        let (mut reg, _, pg) = registry();
        let err = reg.connect(EngineType::Postgres, MYSQL_DSN).unwrap_err();
        assert!(err.to_string().contains("Port is expected"));
        assert!(pg.opened().is_empty());
    }

    #[test]
    fn switch_to_unknown_is_connection_error() {
        let (mut reg, _, _) = registry();
        reg.setup("mysql", MYSQL_DSN).unwrap();
        let err = reg.switch_server(EngineType::Postgres, "db1").unwrap_err();
        assert!(err.is_connection());
        assert!(err.to_string().contains("type=postgres server=db1"));
        assert_eq!(reg.current_dialect(), EngineType::Mysql);
    }

    #[test]
    fn setup_many_rolls_back_on_failure() {
        let mysql = MemoryDriver::new(EngineType::Mysql);
        let pg = MemoryDriver::new(EngineType::Postgres).refuse("db3");
        let mut reg = ConnectionRegistry::empty()
            .with_driver(Box::new(mysql.clone()))
            .with_driver(Box::new(pg.clone()));
        reg.setup("mysql", "host=db0 dbname=app user=u password=p").unwrap();

        let err = reg
            .setup_many([
                (EngineType::Mysql, MYSQL_DSN),
                (EngineType::Postgres, PG_DSN),
                (EngineType::Postgres, "host=db3 port=5432 dbname=app user=u password=p"),
            ])
            .unwrap_err();
        assert!(err.is_connection());
        assert!(err.to_string().contains("Unable to connect to database for postgres on dsn: db3"));
        assert!(err.to_string().contains("connection refused"));

        assert_eq!(reg.connections(), vec![ConnectionKey::new(EngineType::Mysql, "db0")]);
        assert_eq!(reg.current(), Some(&ConnectionKey::new(EngineType::Mysql, "db0")));
        assert_eq!(mysql.closed(), vec!["db1".to_string()]);
        assert_eq!(pg.closed(), vec!["db2".to_string()]);
    }

    #[test]
    fn setup_many_rollback_keeps_replaced_connection() {
        let mysql = MemoryDriver::new(EngineType::Mysql);
        let pg = MemoryDriver::new(EngineType::Postgres).refuse("db3");
        let mut reg = ConnectionRegistry::empty()
            .with_driver(Box::new(mysql.clone()))
            .with_driver(Box::new(pg.clone()));
        reg.setup("mysql", MYSQL_DSN).unwrap();

        let err = reg
            .setup_many([
                (EngineType::Mysql, MYSQL_DSN),
                (EngineType::Postgres, "host=db3 port=5432 dbname=app user=u password=p"),
            ])
            .unwrap_err();
        assert!(err.is_connection());

        let db1 = ConnectionKey::new(EngineType::Mysql, "db1");
        assert_eq!(reg.connections(), vec![db1.clone()]);
        assert_eq!(reg.current(), Some(&db1));
        // only the connection opened by the failed call was closed
        assert_eq!(mysql.opened(), vec!["db1".to_string(), "db1".to_string()]);
        assert_eq!(mysql.closed(), vec!["db1".to_string()]);
        assert!(reg.query("SELECT 1").is_ok());
    }

    #[test]
    fn setup_many_closes_replaced_connection_on_success() {
        let (mut reg, mysql, _) = registry();
        reg.setup("mysql", MYSQL_DSN).unwrap();
        reg.setup_many([(EngineType::Mysql, MYSQL_DSN), (EngineType::Postgres, PG_DSN)])
            .unwrap();
        assert_eq!(reg.connections().len(), 2);
        assert_eq!(mysql.closed(), vec!["db1".to_string()]);
    }

    #[test]
    fn setup_many_connects_all_in_order() {
        let (mut reg, _, _) = registry();
        reg.setup_many([(EngineType::Mysql, MYSQL_DSN), (EngineType::Postgres, PG_DSN)])
            .unwrap();
        assert_eq!(
            reg.connections(),
            vec![
                ConnectionKey::new(EngineType::Mysql, "db1"),
                ConnectionKey::new(EngineType::Postgres, "db2"),
            ]
        );
        assert_eq!(reg.current_dialect(), EngineType::Postgres);
    }

    #[test]
    fn reconnect_replaces_handle() {
        let (mut reg, mysql, _) = registry();
        reg.setup("mysql", MYSQL_DSN).unwrap();
        reg.setup("mysql", MYSQL_DSN).unwrap();
        assert_eq!(reg.connections().len(), 1);
        assert_eq!(mysql.closed(), vec!["db1".to_string()]);
    }

    #[test]
    fn execute_routes_to_current() {
        let (mut reg, mysql, pg) = registry();
        assert!(reg.execute("SELECT 1").unwrap_err().is_connection());

        reg.setup("mysql", MYSQL_DSN).unwrap();
        reg.setup("postgres", PG_DSN).unwrap();
        pg.push_affected(2);
        assert_eq!(reg.execute("DELETE FROM t").unwrap(), ExecOutcome::Affected(2));
        reg.switch_server(EngineType::Mysql, "db1").unwrap();
        reg.query("SELECT 1").unwrap();

        assert_eq!(pg.statements(), vec!["DELETE FROM t".to_string()]);
        assert_eq!(mysql.statements(), vec!["SELECT 1".to_string()]);
    }

    #[test]
    fn disconnect_and_drop_close_connections() {
        let (mut reg, mysql, pg) = registry();
        reg.setup("mysql", MYSQL_DSN).unwrap();
        reg.setup("postgres", PG_DSN).unwrap();
        reg.disconnect(EngineType::Postgres, "db2").unwrap();
        assert!(reg.current().is_none());
        assert_eq!(reg.current_dialect(), EngineType::Mysql);
        assert_eq!(pg.closed(), vec!["db2".to_string()]);

        drop(reg);
        assert_eq!(mysql.closed(), vec!["db1".to_string()]);
    }

    #[test]
    fn missing_driver_is_config_error() {
        let mut reg = ConnectionRegistry::empty();
        assert!(reg.connect(EngineType::Mysql, MYSQL_DSN).unwrap_err().is_config());
    }

    #[test]
    fn table_hook_feeds_rendering() {
        let (mut reg, _, _) = registry();
        reg.set_table_prefix("app_");
        assert_eq!(reg.preformat_table("users"), "app_users");
        reg.clear_table_hook();
        assert_eq!(reg.preformat_table("users"), "users");
    }
}
