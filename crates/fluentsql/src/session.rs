//! Session facade: one registry plus one active statement.
//!
//! Entry points (`select`, `insert`, ...) replace the active statement; routed
//! calls (`and_where`, `join`, `limit`, ...) apply to it and fail with a
//! `Builder` error when its kind does not support them. A failing call
//! discards the statement, so nothing half-built is ever rendered.
//!
//! ```ignore
//! let mut db = Session::from_config(&FluentConfig::load("fluentsql.toml")?)?;
//! let rows = db
//!     .select("users u")?
//!     .fields("u.id, u.email")?
//!     .and_where("u.status = ?", "active")?
//!     .limit(20, None)?
//!     .query()?;
//! ```

use std::fmt;

use crate::builder::{
    Conjunction, Delete, Insert, JoinList, JoinType, Order, Select, SqlStatement, Statement,
    StatementKind, Update,
};
use crate::config::FluentConfig;
use crate::dialect::EngineType;
use crate::driver::ExecOutcome;
use crate::dsn::IntoDsn;
use crate::error::{SqlError, SqlResult};
use crate::expr::Expression;
use crate::registry::ConnectionRegistry;
use crate::row::Row;
use crate::value::{IntoValues, Value};

/// Leading keywords whose statements return rows.
const ROW_KEYWORDS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "EXPLAIN", "WITH"];

type Routed = Result<Statement, StatementKind>;

/// Statement builder bound to a connection registry.
#[derive(Debug, Default)]
pub struct Session {
    registry: ConnectionRegistry,
    statement: Option<Statement>,
}

impl Session {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self {
            registry,
            statement: None,
        }
    }

    /// Connect everything `config` lists and apply its defaults.
    pub fn from_config(config: &FluentConfig) -> SqlResult<Self> {
        Self::with_config(ConnectionRegistry::new(), config)
    }

    /// Like [`Session::from_config`], on a registry with caller-chosen drivers.
    pub fn with_config(mut registry: ConnectionRegistry, config: &FluentConfig) -> SqlResult<Self> {
        config.validate()?;
        registry.set_tracer(config.log.tracer()?);
        if let Some(prefix) = &config.table_prefix {
            registry.set_table_prefix(prefix);
        }

        let mut pairs = Vec::with_capacity(config.connections.len());
        for conn in &config.connections {
            pairs.push((conn.engine, conn.dsn()?));
        }
        registry.setup_many(pairs)?;

        if let Some(default) = &config.default {
            registry.set_default_engine(default.engine);
            let server = match &default.server {
                Some(server) => Some(server.clone()),
                None => registry
                    .connections()
                    .into_iter()
                    .find(|key| key.engine == default.engine)
                    .map(|key| key.server),
            };
            if let Some(server) = server {
                registry.switch_server(default.engine, &server)?;
            }
        }
        Ok(Self::new(registry))
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ConnectionRegistry {
        &mut self.registry
    }

    /// Active statement, if any.
    pub fn statement(&self) -> Option<&Statement> {
        self.statement.as_ref()
    }

    /// Remove and return the active statement.
    pub fn take_statement(&mut self) -> Option<Statement> {
        self.statement.take()
    }

    // ==================== Registry pass-through ====================

    pub fn setup(&mut self, engine: &str, dsn: &str) -> SqlResult<&mut Self> {
        self.registry.setup(engine, dsn)?;
        Ok(self)
    }

    pub fn connect(&mut self, engine: EngineType, dsn: impl IntoDsn) -> SqlResult<&mut Self> {
        self.registry.connect(engine, dsn)?;
        Ok(self)
    }

    pub fn switch_server(&mut self, engine: EngineType, host: &str) -> SqlResult<&mut Self> {
        self.registry.switch_server(engine, host)?;
        Ok(self)
    }

    pub fn current_dialect(&self) -> EngineType {
        self.registry.current_dialect()
    }

    pub fn escape(&self, value: &str) -> String {
        self.registry.escape(value)
    }

    pub fn quote_identifier(&self, name: &str) -> String {
        self.registry.quote_identifier(name)
    }

    // ==================== Entry points ====================

    /// Replace the active statement, failing if it is already broken.
    fn start(&mut self, statement: Statement) -> SqlResult<&mut Self> {
        self.statement = None;
        statement.validate()?;
        self.statement = Some(statement);
        Ok(self)
    }

    pub fn select(&mut self, table: &str) -> SqlResult<&mut Self> {
        self.start(Select::new().table(table).into())
    }

    pub fn insert(&mut self, table: &str) -> SqlResult<&mut Self> {
        self.start(Insert::new(table).into())
    }

    pub fn update(&mut self, table: &str) -> SqlResult<&mut Self> {
        self.start(Update::new(table).into())
    }

    pub fn delete(&mut self, table: &str) -> SqlResult<&mut Self> {
        self.start(Delete::new(table).into())
    }

    pub fn truncate(&mut self, table: &str) -> SqlResult<&mut Self> {
        self.start(Delete::truncate(table).into())
    }

    // ==================== Routing ====================

    /// Apply `f` to the active statement and check the result.
    fn route(&mut self, call: &str, f: impl FnOnce(Statement) -> Routed) -> SqlResult<&mut Self> {
        let Some(statement) = self.statement.take() else {
            return Err(SqlError::builder(format!("`{call}` called with no active statement")));
        };
        match f(statement) {
            Ok(statement) => {
                statement.validate()?;
                self.statement = Some(statement);
                Ok(self)
            }
            Err(kind) => Err(SqlError::builder(format!(
                "`{call}` is not supported on {kind} statements"
            ))),
        }
    }

    /// Route a join call; INSERT/DELETE fail with the join applicability error.
    fn route_join(&mut self, table: &str, on: &str, join_type: JoinType) -> SqlResult<&mut Self> {
        let Some(statement) = self.statement.take() else {
            return Err(SqlError::builder("`join` called with no active statement"));
        };
        JoinList::check_kind(statement.kind())?;
        let statement = match statement {
            Statement::Select(s) => Statement::Select(s.join(table, on, join_type)),
            Statement::Update(s) => Statement::Update(s.join(table, on, join_type)),
            other => other,
        };
        statement.validate()?;
        self.statement = Some(statement);
        Ok(self)
    }

    pub fn table(&mut self, spec: &str) -> SqlResult<&mut Self> {
        self.route("table", |stmt| match stmt {
            Statement::Select(s) => Ok(s.table(spec).into()),
            other => Err(other.kind()),
        })
    }

    pub fn fields(&mut self, spec: &str) -> SqlResult<&mut Self> {
        self.route("fields", |stmt| match stmt {
            Statement::Select(s) => Ok(s.fields(spec).into()),
            other => Err(other.kind()),
        })
    }

    pub fn field_expr(&mut self, expr: Expression) -> SqlResult<&mut Self> {
        self.route("field_expr", |stmt| match stmt {
            Statement::Select(s) => Ok(s.field_expr(expr).into()),
            other => Err(other.kind()),
        })
    }

    /// Row for INSERT, SET list for UPDATE.
    pub fn values<I, K, V>(&mut self, row: I) -> SqlResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.route("values", |stmt| match stmt {
            Statement::Insert(s) => Ok(s.values(row).into()),
            Statement::Update(s) => Ok(s.values(row).into()),
            other => Err(other.kind()),
        })
    }

    /// Multi-row INSERT.
    pub fn rows<R, I, K, V>(&mut self, rows: R) -> SqlResult<&mut Self>
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.route("rows", |stmt| match stmt {
            Statement::Insert(s) => Ok(s.rows(rows).into()),
            other => Err(other.kind()),
        })
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> SqlResult<&mut Self> {
        self.route("set", |stmt| match stmt {
            Statement::Update(s) => Ok(s.set(column, value).into()),
            other => Err(other.kind()),
        })
    }

    pub fn on_duplicate_key(&mut self, clause: &str) -> SqlResult<&mut Self> {
        self.route("on_duplicate_key", |stmt| match stmt {
            Statement::Insert(s) => Ok(s.on_duplicate_key(clause).into()),
            other => Err(other.kind()),
        })
    }

    pub fn and_where(&mut self, template: &str, values: impl IntoValues) -> SqlResult<&mut Self> {
        self.route("and_where", |stmt| match stmt {
            Statement::Select(s) => Ok(s.and_where(template, values).into()),
            Statement::Update(s) => Ok(s.and_where(template, values).into()),
            Statement::Delete(s) => Ok(s.and_where(template, values).into()),
            other => Err(other.kind()),
        })
    }

    pub fn or_where(&mut self, template: &str, values: impl IntoValues) -> SqlResult<&mut Self> {
        self.route("or_where", |stmt| match stmt {
            Statement::Select(s) => Ok(s.or_where(template, values).into()),
            Statement::Update(s) => Ok(s.or_where(template, values).into()),
            Statement::Delete(s) => Ok(s.or_where(template, values).into()),
            other => Err(other.kind()),
        })
    }

    pub fn begin_group(&mut self) -> SqlResult<&mut Self> {
        self.route("begin_group", |stmt| match stmt {
            Statement::Select(s) => Ok(s.begin_group().into()),
            Statement::Update(s) => Ok(s.begin_group().into()),
            Statement::Delete(s) => Ok(s.begin_group().into()),
            other => Err(other.kind()),
        })
    }

    pub fn end_group(&mut self, conj: Conjunction) -> SqlResult<&mut Self> {
        self.route("end_group", |stmt| match stmt {
            Statement::Select(s) => Ok(s.end_group(conj).into()),
            Statement::Update(s) => Ok(s.end_group(conj).into()),
            Statement::Delete(s) => Ok(s.end_group(conj).into()),
            other => Err(other.kind()),
        })
    }

    pub fn join(&mut self, table: &str, on: &str, join_type: JoinType) -> SqlResult<&mut Self> {
        self.route_join(table, on, join_type)
    }

    pub fn inner_join(&mut self, table: &str, on: &str) -> SqlResult<&mut Self> {
        self.route_join(table, on, JoinType::Inner)
    }

    pub fn left_join(&mut self, table: &str, on: &str) -> SqlResult<&mut Self> {
        self.route_join(table, on, JoinType::Left)
    }

    pub fn right_join(&mut self, table: &str, on: &str) -> SqlResult<&mut Self> {
        self.route_join(table, on, JoinType::Right)
    }

    pub fn outer_join(&mut self, table: &str, on: &str) -> SqlResult<&mut Self> {
        self.route_join(table, on, JoinType::Outer)
    }

    pub fn natural_join(&mut self, table: &str) -> SqlResult<&mut Self> {
        self.route_join(table, "", JoinType::Natural)
    }

    pub fn cross_join(&mut self, table: &str) -> SqlResult<&mut Self> {
        self.route_join(table, "", JoinType::Cross)
    }

    pub fn group_by(&mut self, spec: &str) -> SqlResult<&mut Self> {
        self.route("group_by", |stmt| match stmt {
            Statement::Select(s) => Ok(s.group_by(spec).into()),
            other => Err(other.kind()),
        })
    }

    pub fn order_by(&mut self, spec: &str, order: Order) -> SqlResult<&mut Self> {
        self.route("order_by", |stmt| match stmt {
            Statement::Select(s) => Ok(s.order_by(spec, order).into()),
            other => Err(other.kind()),
        })
    }

    pub fn having(&mut self, template: &str, values: impl IntoValues) -> SqlResult<&mut Self> {
        self.route("having", |stmt| match stmt {
            Statement::Select(s) => Ok(s.having(template, values).into()),
            other => Err(other.kind()),
        })
    }

    pub fn limit(&mut self, count: u64, offset: Option<u64>) -> SqlResult<&mut Self> {
        self.route("limit", |stmt| match stmt {
            Statement::Select(s) => Ok(s.limit(count, offset).into()),
            other => Err(other.kind()),
        })
    }

    // ==================== Render & execute ====================

    fn active(&self) -> SqlResult<&Statement> {
        self.statement
            .as_ref()
            .ok_or_else(|| SqlError::builder("No statement set"))
    }

    /// Render the active statement against the current connection.
    pub fn to_sql(&self) -> SqlResult<String> {
        self.active()?.render(&self.registry)
    }

    /// Render and run the active statement, collecting rows.
    pub fn query(&mut self) -> SqlResult<Vec<Row>> {
        let sql = self.to_sql()?;
        self.registry.query(&sql)
    }

    /// Render and execute the active statement.
    pub fn exec(&mut self) -> SqlResult<ExecOutcome> {
        let sql = self.to_sql()?;
        self.registry.execute(&sql)
    }

    /// `SELECT COUNT(*) AS counter FROM table [WHERE ..]`, leaving the active
    /// statement untouched.
    pub fn count(&mut self, table: &str, template: &str, values: impl IntoValues) -> SqlResult<u64> {
        let mut select = Select::new()
            .table(table)
            .field_expr(Expression::count("*").as_alias("counter"));
        if !template.trim().is_empty() {
            select = select.and_where(template, values);
        }
        let rows = select.query(&mut self.registry)?;
        match rows.first() {
            Some(row) => row.try_get("counter"),
            None => Ok(0),
        }
    }

    /// Run raw SQL: row-returning statements go through `query`, the rest
    /// through `execute`.
    pub fn raw(&mut self, sql: &str) -> SqlResult<ExecOutcome> {
        let head = sql
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        if ROW_KEYWORDS.contains(&head.as_str()) {
            Ok(ExecOutcome::Rows(self.registry.query(sql)?))
        } else {
            self.registry.execute(sql)
        }
    }

    /// Set the client character set on the current connection.
    pub fn set_charset(&mut self, charset: &str) -> SqlResult<()> {
        let charset = charset.trim();
        if charset.is_empty()
            || !charset
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(SqlError::builder(format!("invalid charset name: '{charset}'")));
        }
        let sql = match self.registry.current_dialect() {
            EngineType::Mysql => format!("SET CHARACTER SET {charset}"),
            EngineType::Postgres => format!("SET client_encoding TO '{charset}'"),
        };
        self.registry.execute(&sql).map(|_| ())
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.statement {
            None => f.write_str("Nothing set."),
            Some(statement) => match statement.render(&self.registry) {
                Ok(sql) => f.write_str(&sql),
                Err(e) => write!(f, "{e}"),
            },
        }
    }
}
