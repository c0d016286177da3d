//! DELETE and TRUNCATE statement builder.

use crate::builder::where_clause::{Conjunction, WhereClause};
use crate::builder::{SqlStatement, StatementKind};
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::value::IntoValues;

/// DELETE builder; [`Delete::truncate`] switches it to `TRUNCATE`.
#[derive(Clone, Debug, PartialEq)]
pub struct Delete {
    /// Target table
    table: String,
    /// `Delete` or `Truncate`
    kind: StatementKind,
    /// WHERE fragments (DELETE only)
    where_clause: WhereClause,
    /// Build error
    build_error: Option<String>,
}

impl Delete {
    pub fn new(table: &str) -> Self {
        Self::with_kind(table, StatementKind::Delete)
    }

    /// `TRUNCATE <table>`; no WHERE is permitted.
    pub fn truncate(table: &str) -> Self {
        Self::with_kind(table, StatementKind::Truncate)
    }

    fn with_kind(table: &str, kind: StatementKind) -> Self {
        let table = table.trim();
        let build_error = if table.is_empty() {
            Some(format!("{kind} table is empty"))
        } else {
            None
        };
        Self {
            table: table.to_string(),
            kind,
            where_clause: WhereClause::new(),
            build_error,
        }
    }

    fn where_allowed(&mut self) -> bool {
        if self.kind == StatementKind::Truncate {
            if self.build_error.is_none() {
                self.build_error = Some("TRUNCATE does not accept a WHERE clause".to_string());
            }
            return false;
        }
        true
    }

    pub fn and_where(mut self, template: &str, values: impl IntoValues) -> Self {
        if self.where_allowed() {
            self.where_clause.and_where(template, values);
        }
        self
    }

    pub fn or_where(mut self, template: &str, values: impl IntoValues) -> Self {
        if self.where_allowed() {
            self.where_clause.or_where(template, values);
        }
        self
    }

    pub fn begin_group(mut self) -> Self {
        if self.where_allowed() {
            self.where_clause.begin_group();
        }
        self
    }

    pub fn end_group(mut self, conj: Conjunction) -> Self {
        if self.where_allowed() {
            self.where_clause.end_group(conj);
        }
        self
    }

    pub fn group(mut self, conj: Conjunction, f: impl FnOnce(&mut WhereClause)) -> Self {
        if self.where_allowed() {
            self.where_clause.begin_group();
            f(&mut self.where_clause);
            self.where_clause.end_group(conj);
        }
        self
    }

    fn build_delete_sql(&self, dialect: &Dialect<'_>) -> SqlResult<String> {
        self.validate()?;
        let table = dialect.quote_table(&self.table);
        match self.kind {
            StatementKind::Truncate => Ok(format!("TRUNCATE {table}")),
            StatementKind::Delete => {
                let mut sql = format!("DELETE FROM {table}");
                if let Some(where_sql) = self.where_clause.render(dialect)? {
                    sql.push_str(" WHERE ");
                    sql.push_str(&where_sql);
                }
                Ok(sql)
            }
            other => Err(SqlError::builder(format!("not a delete statement: {other}"))),
        }
    }
}

impl SqlStatement for Delete {
    fn kind(&self) -> StatementKind {
        self.kind
    }

    fn build_error(&self) -> Option<&str> {
        self.build_error.as_deref().or(self.where_clause.build_error())
    }

    fn render_with(&self, dialect: &Dialect<'_>) -> SqlResult<String> {
        self.build_delete_sql(dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::EngineType;

    #[test]
    fn test_delete_where() {
        let qb = Delete::new("sessions")
            .and_where("expires_at < ?", "2024-01-01")
            .or_where("revoked = ?", true);
        assert_eq!(
            qb.to_sql(EngineType::Postgres).unwrap(),
            r#"DELETE FROM "sessions" WHERE (expires_at < '2024-01-01') OR (revoked = TRUE)"#
        );
    }

    #[test]
    fn test_delete_without_where() {
        assert_eq!(
            Delete::new("logs").to_sql(EngineType::Mysql).unwrap(),
            "DELETE FROM `logs`"
        );
    }

    #[test]
    fn test_truncate() {
        let qb = Delete::truncate("app.logs");
        assert_eq!(qb.kind(), StatementKind::Truncate);
        assert_eq!(qb.to_sql(EngineType::Mysql).unwrap(), "TRUNCATE `app`.`logs`");
    }

    #[test]
    fn test_truncate_rejects_where() {
        let qb = Delete::truncate("logs").and_where("id = ?", 1);
        assert!(qb.to_sql(EngineType::Mysql).unwrap_err().is_builder());
    }
}
