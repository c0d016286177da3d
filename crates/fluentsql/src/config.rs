//! TOML configuration for [`Session::from_config`](crate::Session::from_config).
//!
//! ```toml
//! default = { engine = "postgres", server = "db2" }
//! table_prefix = "app_"
//!
//! [log]
//! level = "debug"
//! max_sql_length = 200
//!
//! [[connections]]
//! engine = "mysql"
//! dsn = "host=db1 dbname=app user=app password=${APP_DB_PASSWORD}"
//!
//! [[connections]]
//! engine = "postgres"
//! dsn = { server = "db2", port = 5432, dbname = "app", user = "app", password = "secret" }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use tracing::Level;

use crate::dialect::EngineType;
use crate::dsn::Dsn;
use crate::error::{SqlError, SqlResult};
use crate::trace::SqlTracer;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FluentConfig {
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
    pub default: Option<DefaultConnection>,
    pub table_prefix: Option<String>,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub engine: EngineType,
    pub dsn: DsnSource,
}

/// A connection's DSN: a `key=value` string, a URL, or an inline table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DsnSource {
    Text(String),
    Table(BTreeMap<String, DsnValue>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DsnValue {
    Text(String),
    Int(i64),
}

impl DsnValue {
    fn as_string(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Int(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultConnection {
    pub engine: EngineType,
    pub server: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// `error`, `warn`, `info`, `debug` or `trace`.
    pub level: Option<String>,
    /// `0` disables truncation.
    pub max_sql_length: Option<usize>,
}

impl LogConfig {
    pub fn tracer(&self) -> SqlResult<SqlTracer> {
        let mut tracer = SqlTracer::new();
        if let Some(level) = &self.level {
            let level = Level::from_str(level.trim())
                .map_err(|_| SqlError::config(format!("invalid log level: {level}")))?;
            tracer = tracer.level(level);
        }
        match self.max_sql_length {
            Some(0) => tracer = tracer.no_truncate(),
            Some(len) => tracer = tracer.max_sql_length(len),
            None => {}
        }
        Ok(tracer)
    }
}

impl ConnectionConfig {
    /// Parse the configured DSN (not yet validated against the engine).
    pub fn dsn(&self) -> SqlResult<Dsn> {
        match &self.dsn {
            DsnSource::Text(s) => Dsn::parse(s),
            DsnSource::Table(map) => {
                Dsn::from_pairs(map.iter().map(|(k, v)| (k.as_str(), v.as_string())))
            }
        }
    }
}

impl FluentConfig {
    /// Read, expand and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> SqlResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
            .map_err(|e| SqlError::config(format!("{}: {}", path.display(), e.message())))
    }

    pub fn from_toml_str(raw: &str) -> SqlResult<Self> {
        let mut config: Self = toml::from_str(raw)
            .map_err(|e| SqlError::config(format!("failed to parse config: {e}")))?;
        config.expand_env()?;
        config.validate()?;
        Ok(config)
    }

    fn expand_env(&mut self) -> SqlResult<()> {
        for conn in &mut self.connections {
            match &mut conn.dsn {
                DsnSource::Text(s) => *s = expand_env_vars(s)?,
                DsnSource::Table(map) => {
                    for value in map.values_mut() {
                        if let DsnValue::Text(s) = value {
                            *s = expand_env_vars(s)?;
                        }
                    }
                }
            }
        }
        if let Some(prefix) = self.table_prefix.as_mut() {
            *prefix = expand_env_vars(prefix)?;
        }
        if let Some(server) = self.default.as_mut().and_then(|d| d.server.as_mut()) {
            *server = expand_env_vars(server)?;
        }
        Ok(())
    }

    /// Check every DSN and that `default` names a configured connection.
    pub fn validate(&self) -> SqlResult<()> {
        if self.connections.is_empty() {
            return Err(SqlError::config("at least one [[connections]] entry is required"));
        }

        let mut seen = HashSet::new();
        for conn in &self.connections {
            let dsn = conn.dsn()?;
            dsn.validate(conn.engine)?;
            if !seen.insert((conn.engine, dsn.server.clone())) {
                return Err(SqlError::config(format!(
                    "duplicate connection: {}:{}",
                    conn.engine, dsn.server
                )));
            }
        }

        if let Some(default) = &self.default {
            let known = match &default.server {
                Some(server) => seen.contains(&(default.engine, server.clone())),
                None => seen.iter().any(|(engine, _)| *engine == default.engine),
            };
            if !known {
                return Err(SqlError::config(format!(
                    "default connection {}:{} is not configured",
                    default.engine,
                    default.server.as_deref().unwrap_or("*")
                )));
            }
        }

        if let Some(prefix) = &self.table_prefix {
            if prefix.trim().is_empty() {
                return Err(SqlError::config("table_prefix must not be empty"));
            }
        }

        self.log.tracer().map(|_| ())
    }
}

/// Replace `${VAR}` with the value of environment variable `VAR`.
fn expand_env_vars(input: &str) -> SqlResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                return Err(SqlError::config(format!(
                    "unterminated env var reference: ${{{key}}}"
                )));
            }
            if key.is_empty() {
                return Err(SqlError::config("invalid env var reference: ${}"));
            }

            let value = std::env::var(&key).map_err(|_| {
                SqlError::config(format!("missing env var for config expansion: {key}"))
            })?;
            out.push_str(&value);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}
