//! Engine types and the dialect formatter.
//!
//! Rendering never reaches for global state: every builder renders against a
//! [`SqlContext`], the token that says which engine is active, how text is
//! escaped and how table names are preformatted. [`crate::ConnectionRegistry`]
//! implements it for the current connection; [`EngineType`] implements it for
//! offline rendering.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::builder::SqlStatement;
use crate::driver::escape;
use crate::error::{SqlError, SqlResult};
use crate::ident::Ident;
use crate::value::Value;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum EngineType {
    Mysql,
    Postgres,
}

impl EngineType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    /// Identifier quote character.
    pub fn quote_char(self) -> char {
        match self {
            Self::Mysql => '`',
            Self::Postgres => '"',
        }
    }

    /// Quote a (possibly dotted) identifier for this engine.
    pub fn quote_identifier(self, name: &str) -> String {
        Ident::parse(name).to_sql(self.quote_char())
    }

    /// Escape a string literal body the way this engine's driver does.
    pub fn escape(self, value: &str) -> String {
        match self {
            Self::Mysql => escape::mysql(value),
            Self::Postgres => escape::postgres(value),
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineType {
    type Err = SqlError;

    fn from_str(s: &str) -> SqlResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "postgres" | "postgresql" | "pgsql" | "pg" => Ok(Self::Postgres),
            "" => Err(SqlError::config("engine type is empty")),
            other => Err(SqlError::config(format!("unknown engine type: {other}"))),
        }
    }
}

impl TryFrom<String> for EngineType {
    type Error = SqlError;

    fn try_from(s: String) -> SqlResult<Self> {
        s.parse()
    }
}

/// Render-time dialect token.
pub trait SqlContext {
    /// Engine whose quoting rules apply.
    fn engine(&self) -> EngineType;

    /// Escape a string literal body (without surrounding quotes).
    fn escape(&self, value: &str) -> String;

    /// Rewrite a bare table name before quoting (e.g. add a prefix).
    fn preformat_table(&self, name: &str) -> String {
        name.to_string()
    }
}

impl SqlContext for EngineType {
    fn engine(&self) -> EngineType {
        *self
    }

    fn escape(&self, value: &str) -> String {
        EngineType::escape(*self, value)
    }
}

/// Dialect formatter bound to a [`SqlContext`].
#[derive(Clone, Copy)]
pub struct Dialect<'a> {
    ctx: &'a dyn SqlContext,
}

impl<'a> Dialect<'a> {
    pub fn new(ctx: &'a dyn SqlContext) -> Self {
        Self { ctx }
    }

    pub fn engine(&self) -> EngineType {
        self.ctx.engine()
    }

    pub fn escape(&self, value: &str) -> String {
        self.ctx.escape(value)
    }

    /// Quote a column or other identifier. `*` segments stay bare.
    pub fn quote_identifier(&self, name: &str) -> String {
        self.engine().quote_identifier(name)
    }

    /// Quote an [`Ident`] that was already parsed.
    pub fn quote_ident(&self, ident: &Ident) -> String {
        ident.to_sql(self.engine().quote_char())
    }

    /// Quote a table reference, running the preformat hook on the table segment.
    pub fn quote_table(&self, name: &str) -> String {
        let ident = Ident::parse(name).map_last(|t| self.ctx.preformat_table(t).trim().to_string());
        self.quote_ident(&ident)
    }

    /// Escape and single-quote a string literal.
    ///
    /// Postgres values holding a backslash are written as `E'...'`.
    pub fn quote_literal(&self, value: &str) -> String {
        let escaped = self.escape(value);
        let mut out = String::with_capacity(escaped.len() + 3);
        if self.engine() == EngineType::Postgres && escape::postgres_needs_e(value) {
            out.push('E');
        }
        out.push('\'');
        out.push_str(&escaped);
        out.push('\'');
        out
    }

    /// Render a bound value.
    pub fn format_value(&self, value: &Value) -> SqlResult<String> {
        Ok(match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            Value::Float(_) => "NULL".to_string(),
            Value::Text(s) => self.quote_literal(s),
            Value::Expr(expr) => expr.render(self, None)?,
            Value::Select(select) => format!("({})", select.render_with(self)?),
        })
    }
}

impl fmt::Debug for Dialect<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialect").field("engine", &self.engine()).finish()
    }
}
