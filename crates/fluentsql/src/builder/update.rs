//! UPDATE statement builder.

use crate::builder::join::{JoinList, JoinType, TableRef};
use crate::builder::where_clause::{Conjunction, WhereClause};
use crate::builder::{SqlStatement, StatementKind};
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::value::{IntoValues, Value};

/// SET field value type.
#[derive(Clone, Debug, PartialEq)]
enum SetField {
    /// Formatted value
    Value(Value),
    /// Raw SQL expression
    Raw(String),
}

/// UPDATE builder.
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    /// Target table, optionally aliased (`users u`)
    table: Option<TableRef>,
    /// SET clauses (column, value)
    set_fields: Vec<(String, SetField)>,
    /// JOIN clauses
    joins: JoinList,
    /// WHERE fragments
    where_clause: WhereClause,
    /// Build error
    build_error: Option<String>,
}

impl Update {
    pub fn new(table: &str) -> Self {
        let (table, build_error) = match TableRef::parse(table) {
            Ok(t) => (Some(t), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            table,
            set_fields: Vec::new(),
            joins: JoinList::new(StatementKind::Update),
            where_clause: WhereClause::new(),
            build_error,
        }
    }

    /// Set a column.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set_fields
            .push((column.trim().to_string(), SetField::Value(value.into())));
        self
    }

    /// Set a column to a raw SQL expression (e.g. `hits + 1`).
    ///
    /// The expression is concatenated as-is.
    pub fn set_raw(mut self, column: &str, expr: &str) -> Self {
        self.set_fields
            .push((column.trim().to_string(), SetField::Raw(expr.to_string())));
        self
    }

    /// Set several columns from `(column, value)` pairs.
    pub fn values<I, K, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (column, value) in row {
            self = self.set(column.as_ref(), value);
        }
        self
    }

    // ==================== JOIN ====================

    pub fn join(mut self, table: &str, on: &str, join_type: JoinType) -> Self {
        self.joins.push_spec(table, on, join_type);
        self
    }

    pub fn join_ref(mut self, table: TableRef, on: &str, join_type: JoinType) -> Self {
        self.joins.push(table, on, join_type);
        self
    }

    pub fn inner_join(self, table: &str, on: &str) -> Self {
        self.join(table, on, JoinType::Inner)
    }

    pub fn left_join(self, table: &str, on: &str) -> Self {
        self.join(table, on, JoinType::Left)
    }

    pub fn right_join(self, table: &str, on: &str) -> Self {
        self.join(table, on, JoinType::Right)
    }

    pub fn outer_join(self, table: &str, on: &str) -> Self {
        self.join(table, on, JoinType::Outer)
    }

    pub fn full_join(self, table: &str, on: &str) -> Self {
        self.join(table, on, JoinType::Full)
    }

    pub fn natural_join(self, table: &str) -> Self {
        self.join(table, "", JoinType::Natural)
    }

    pub fn cross_join(self, table: &str) -> Self {
        self.join(table, "", JoinType::Cross)
    }

    // ==================== WHERE ====================

    pub fn and_where(mut self, template: &str, values: impl IntoValues) -> Self {
        self.where_clause.and_where(template, values);
        self
    }

    pub fn or_where(mut self, template: &str, values: impl IntoValues) -> Self {
        self.where_clause.or_where(template, values);
        self
    }

    pub fn begin_group(mut self) -> Self {
        self.where_clause.begin_group();
        self
    }

    pub fn end_group(mut self, conj: Conjunction) -> Self {
        self.where_clause.end_group(conj);
        self
    }

    pub fn group(mut self, conj: Conjunction, f: impl FnOnce(&mut WhereClause)) -> Self {
        self.where_clause.begin_group();
        f(&mut self.where_clause);
        self.where_clause.end_group(conj);
        self
    }

    fn build_update_sql(&self, dialect: &Dialect<'_>) -> SqlResult<String> {
        self.validate()?;
        let Some(table) = &self.table else {
            return Err(SqlError::builder("UPDATE requires a table"));
        };
        if self.set_fields.is_empty() {
            return Err(SqlError::builder("UPDATE SET clause cannot be empty"));
        }

        let mut sets = Vec::with_capacity(self.set_fields.len());
        for (column, field) in &self.set_fields {
            let value = match field {
                SetField::Value(v) => dialect.format_value(v)?,
                SetField::Raw(expr) => expr.clone(),
            };
            sets.push(format!("{} = {}", dialect.quote_identifier(column), value));
        }

        let mut sql = format!("UPDATE {} SET {}", table.render(dialect)?, sets.join(", "));

        let joins = self.joins.render(dialect)?;
        if !joins.is_empty() {
            sql.push(' ');
            sql.push_str(&joins);
        }

        if let Some(where_sql) = self.where_clause.render(dialect)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        Ok(sql)
    }
}

impl SqlStatement for Update {
    fn kind(&self) -> StatementKind {
        StatementKind::Update
    }

    fn build_error(&self) -> Option<&str> {
        self.build_error
            .as_deref()
            .or(self.where_clause.build_error())
            .or(self.joins.build_error())
    }

    fn render_with(&self, dialect: &Dialect<'_>) -> SqlResult<String> {
        self.build_update_sql(dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::EngineType;

    #[test]
    fn test_update_set_where() {
        let qb = Update::new("users")
            .set("name", "Ann")
            .set("age", 31)
            .and_where("id = ?", 7);
        assert_eq!(
            qb.to_sql(EngineType::Mysql).unwrap(),
            "UPDATE `users` SET `name` = 'Ann', `age` = 31 WHERE (id = 7)"
        );
    }

    #[test]
    fn test_update_values_and_raw() {
        let qb = Update::new("counters")
            .values([("label", Value::from("home")), ("reset_at", Value::Null)])
            .set_raw("hits", "hits + 1");
        assert_eq!(
            qb.to_sql(EngineType::Postgres).unwrap(),
            r#"UPDATE "counters" SET "label" = 'home', "reset_at" = NULL, "hits" = hits + 1"#
        );
    }

    #[test]
    fn test_update_with_join() {
        let qb = Update::new("orders o")
            .set("status", "vip")
            .inner_join("users u", "u.id = o.user_id")
            .and_where("u.tier = ?", "gold");
        assert_eq!(
            qb.to_sql(EngineType::Mysql).unwrap(),
            "UPDATE `orders` AS o SET `status` = 'vip' INNER JOIN `users` AS u \
             ON u.id = o.user_id WHERE (u.tier = 'gold')"
        );
    }

    #[test]
    fn test_update_without_set_is_error() {
        let qb = Update::new("users").and_where("id = 1", ());
        assert!(qb.to_sql(EngineType::Mysql).unwrap_err().is_builder());
    }

    #[test]
    fn test_update_bad_table_is_error() {
        assert!(Update::new("").set("a", 1).build_error().is_some());
    }
}
