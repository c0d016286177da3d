//! # fluentsql
//!
//! A fluent SQL statement builder with a multi-dialect connection registry.
//!
//! ## Features
//!
//! - **Builders**: SELECT / INSERT / UPDATE / DELETE / TRUNCATE with `?` placeholder
//!   substitution, grouped AND/OR predicates, joins and sub-selects
//! - **Dialects**: MySQL backtick and PostgreSQL double-quote identifier quoting,
//!   driver-backed string escaping
//! - **Registry**: several live connections keyed by `(engine, server)`, one current
//! - **Table hook**: a single user rewrite (e.g. a prefix) applied to every table name
//! - **Tracing**: every executed statement is emitted under the `fluentsql.sql` target
//!
//! ## Builders
//!
//! ```ignore
//! use fluentsql::{select, EngineType, Order, SqlStatement};
//!
//! let sql = select("users u")
//!     .fields("u.id, u.email")
//!     .and_where("u.status = ?", "active")
//!     .or_where("u.id IN (?, ?, ?)", vec![1, 2, 3])
//!     .order_by("u.id", Order::Desc)
//!     .limit(10, None)
//!     .to_sql(EngineType::Postgres)?;
//! ```
//!
//! ## Session
//!
//! ```ignore
//! use fluentsql::Session;
//!
//! let mut db = Session::default();
//! db.setup("postgres", "host=db1 port=5432 dbname=app user=app password=secret")?;
//! let affected = db
//!     .update("users")?
//!     .set("status", "inactive")?
//!     .and_where("last_login < ?", "2020-01-01")?
//!     .exec()?
//!     .count();
//! ```

pub mod builder;
pub mod config;
pub mod dialect;
pub mod driver;
pub mod dsn;
pub mod error;
pub mod expr;
pub mod ident;
pub mod registry;
pub mod row;
pub mod session;
pub mod trace;
pub mod value;

pub use builder::{
    Conjunction, Delete, Insert, JoinType, Order, Select, SqlStatement, Statement, StatementKind,
    Update, delete, insert, select, truncate, update,
};
pub use config::FluentConfig;
pub use dialect::{EngineType, SqlContext};
pub use driver::{Connection, Driver, ExecOutcome, MemoryDriver};
pub use dsn::{Dsn, IntoDsn};
pub use error::{SqlError, SqlResult};
pub use expr::{Expression, Operand};
pub use ident::Ident;
pub use registry::{ConnectionKey, ConnectionRegistry};
pub use row::{FromRow, Row};
pub use session::Session;
pub use trace::SqlTracer;
pub use value::{IntoValues, Value};

#[cfg(feature = "mysql")]
pub use driver::MySqlDriver;

#[cfg(feature = "postgres")]
pub use driver::PostgresDriver;
