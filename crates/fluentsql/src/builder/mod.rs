//! Fluent statement builders.
//!
//! Every builder is a plain value: it accumulates state through consuming
//! `fn x(mut self, ..) -> Self` calls and renders against a [`SqlContext`] only
//! when asked. Nothing is bound to a connection until execution.
//!
//! An invalid call (placeholder/value mismatch, join on a DELETE, ragged insert
//! rows, ...) is recorded as the builder's first error; rendering or executing
//! such a builder fails with [`SqlError::Builder`] and never yields SQL.
//!
//! # Usage
//!
//! ```ignore
//! use fluentsql::builder::{self, SqlStatement};
//! use fluentsql::EngineType;
//!
//! let sql = builder::select("users u")
//!     .fields("u.id, u.name")
//!     .left_join("orders o", "o.user_id = u.id")
//!     .and_where("u.status = ?", "active")
//!     .order_by_desc("u.created_at")
//!     .limit(10, None)
//!     .to_sql(EngineType::Postgres)?;
//! ```

use std::fmt;

use crate::dialect::{Dialect, EngineType, SqlContext};
use crate::driver::ExecOutcome;
use crate::error::{SqlError, SqlResult};
use crate::registry::ConnectionRegistry;
use crate::row::Row;

pub mod delete;
pub mod insert;
pub mod join;
pub mod select;
pub mod update;
pub mod where_clause;

pub use delete::Delete;
pub use insert::Insert;
pub use join::{JoinList, JoinType, TableRef, TableSource};
pub use select::{Order, Select};
pub use update::Update;
pub use where_clause::{Conjunction, Predicate, WhereClause};

/// Kind of statement a builder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Truncate,
}

impl StatementKind {
    pub fn supports_joins(self) -> bool {
        matches!(self, Self::Select | Self::Update)
    }

    pub fn supports_where(self) -> bool {
        matches!(self, Self::Select | Self::Update | Self::Delete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared behaviour of all statement builders.
pub trait SqlStatement {
    /// Statement kind this builder produces.
    fn kind(&self) -> StatementKind;

    /// First error recorded by a builder call, if any.
    fn build_error(&self) -> Option<&str>;

    /// Render under an already bound dialect.
    fn render_with(&self, dialect: &Dialect<'_>) -> SqlResult<String>;

    /// Validate builder state before rendering.
    fn validate(&self) -> SqlResult<()> {
        match self.build_error() {
            Some(err) => Err(SqlError::builder(err)),
            None => Ok(()),
        }
    }

    /// Render against a dialect token (a registry or an engine type).
    fn render(&self, ctx: &dyn SqlContext) -> SqlResult<String> {
        self.render_with(&Dialect::new(ctx))
    }

    /// Render offline for `engine`.
    fn to_sql(&self, engine: EngineType) -> SqlResult<String> {
        self.render(&engine)
    }

    /// Render against the registry's current connection and fetch rows.
    fn query(&self, registry: &mut ConnectionRegistry) -> SqlResult<Vec<Row>> {
        let sql = self.render(&*registry)?;
        registry.query(&sql)
    }

    /// Render against the registry's current connection and execute.
    fn execute(&self, registry: &mut ConnectionRegistry) -> SqlResult<ExecOutcome> {
        let sql = self.render(&*registry)?;
        registry.execute(&sql)
    }
}

/// The active statement held by a [`crate::Session`].
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Statement {
    fn inner(&self) -> &dyn SqlStatement {
        match self {
            Self::Select(s) => s,
            Self::Insert(s) => s,
            Self::Update(s) => s,
            Self::Delete(s) => s,
        }
    }
}

impl SqlStatement for Statement {
    fn kind(&self) -> StatementKind {
        self.inner().kind()
    }

    fn build_error(&self) -> Option<&str> {
        self.inner().build_error()
    }

    fn render_with(&self, dialect: &Dialect<'_>) -> SqlResult<String> {
        self.inner().render_with(dialect)
    }
}

impl From<Select> for Statement {
    fn from(s: Select) -> Self {
        Self::Select(s)
    }
}

impl From<Insert> for Statement {
    fn from(s: Insert) -> Self {
        Self::Insert(s)
    }
}

impl From<Update> for Statement {
    fn from(s: Update) -> Self {
        Self::Update(s)
    }
}

impl From<Delete> for Statement {
    fn from(s: Delete) -> Self {
        Self::Delete(s)
    }
}

/// Start a SELECT from a table spec (see [`Select::table`]).
pub fn select(table: &str) -> Select {
    Select::new().table(table)
}

/// Start an INSERT into `table`.
pub fn insert(table: &str) -> Insert {
    Insert::new(table)
}

/// Start an UPDATE of `table`.
pub fn update(table: &str) -> Update {
    Update::new(table)
}

/// Start a DELETE FROM `table`.
pub fn delete(table: &str) -> Delete {
    Delete::new(table)
}

/// Start a TRUNCATE of `table`.
pub fn truncate(table: &str) -> Delete {
    Delete::truncate(table)
}

#[cfg(test)]
mod tests;
